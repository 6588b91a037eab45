//! Stimulus sequence generation and match detection
//!
//! Generation is deliberately generate-then-verify: eligible positions copy
//! the symbol `level` back with a fixed probability, and every other position
//! is drawn uniformly from the alphabet. A uniform draw can repeat the symbol
//! `level` back by chance; that is a real match the participant must catch,
//! so the match count is always recounted on the realized sequence.

use crate::error::TrainingError;
use crate::nback::types::{NBackSequence, TrialOutcome};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Generation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceParams {
    pub length: usize,
    pub level: usize,
    pub forced_match_probability: f64,
}

impl SequenceParams {
    pub fn new(length: usize, level: usize) -> Self {
        Self {
            length,
            level,
            forced_match_probability: 0.3,
        }
    }

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.forced_match_probability = probability;
        self
    }

    fn validate(&self, alphabet: &[char]) -> Result<(), TrainingError> {
        if self.level < 1 {
            return Err(TrainingError::InvalidSequenceParams(
                "level must be at least 1".to_string(),
            ));
        }
        if self.length <= self.level {
            return Err(TrainingError::InvalidSequenceParams(format!(
                "length {} must exceed level {}",
                self.length, self.level
            )));
        }
        if alphabet.len() < 2 {
            return Err(TrainingError::InvalidSequenceParams(format!(
                "alphabet needs at least 2 symbols, got {}",
                alphabet.len()
            )));
        }
        if !(0.0..=1.0).contains(&self.forced_match_probability) {
            return Err(TrainingError::InvalidSequenceParams(format!(
                "forced match probability {} outside [0, 1]",
                self.forced_match_probability
            )));
        }
        Ok(())
    }
}

/// Generate an N-back sequence and its ground-truth match count.
pub fn generate_sequence<R: Rng + ?Sized>(
    params: SequenceParams,
    alphabet: &[char],
    rng: &mut R,
) -> Result<NBackSequence, TrainingError> {
    params.validate(alphabet)?;

    let mut symbols: Vec<char> = Vec::with_capacity(params.length);
    for i in 0..params.length {
        let symbol = if i >= params.level && rng.gen_bool(params.forced_match_probability) {
            symbols[i - params.level]
        } else {
            // validate() guarantees a non-empty alphabet
            *alphabet.choose(rng).unwrap_or(&alphabet[0])
        };
        symbols.push(symbol);
    }

    let match_count = count_matches(&symbols, params.level);
    debug!(
        level = params.level,
        length = params.length,
        match_count,
        "generated n-back sequence"
    );

    Ok(NBackSequence {
        level: params.level,
        symbols,
        match_count,
    })
}

/// Count positions `i >= level` where `sequence[i] == sequence[i - level]`.
///
/// Level 0 has no meaningful comparison and counts as no matches.
pub fn count_matches<T: PartialEq>(sequence: &[T], level: usize) -> u32 {
    if level == 0 {
        return 0;
    }
    (level..sequence.len())
        .filter(|&i| sequence[i] == sequence[i - level])
        .count() as u32
}

/// Whether the stimulus at `index` repeats the one `level` positions earlier.
///
/// Indices before `level` (and past the end) are never matches.
pub fn is_match<T: PartialEq>(sequence: &[T], level: usize, index: usize) -> bool {
    if level == 0 || index < level {
        return false;
    }
    match (sequence.get(index), sequence.get(index - level)) {
        (Some(current), Some(previous)) => current == previous,
        _ => false,
    }
}

/// Classify a participant's behaviour on one stimulus.
pub fn classify_response<T: PartialEq>(
    sequence: &[T],
    level: usize,
    index: usize,
    responded: bool,
) -> TrialOutcome {
    match (is_match(sequence, level, index), responded) {
        (true, true) => TrialOutcome::Hit,
        (true, false) => TrialOutcome::Miss,
        (false, true) => TrialOutcome::FalseAlarm,
        (false, false) => TrialOutcome::CorrectRejection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const ALPHABET: [char; 8] = ['A', 'B', 'C', 'D', 'H', 'K', 'L', 'M'];

    #[test]
    fn test_count_matches_known_sequence() {
        let seq = ['A', 'B', 'A', 'B', 'C'];
        assert_eq!(count_matches(&seq, 2), 2);
        assert_eq!(count_matches(&seq, 1), 0);
        assert_eq!(count_matches(&seq, 5), 0);
        assert_eq!(count_matches(&seq, 0), 0);
    }

    #[test]
    fn test_generated_count_matches_recount() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for level in 1..=3 {
            for _ in 0..50 {
                let seq =
                    generate_sequence(SequenceParams::new(15, level), &ALPHABET, &mut rng).unwrap();
                assert_eq!(seq.len(), 15);
                assert_eq!(seq.match_count, count_matches(&seq.symbols, level));
                assert!(seq.symbols.iter().all(|s| ALPHABET.contains(s)));
            }
        }
    }

    #[test]
    fn test_probability_one_forces_all_matches() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let params = SequenceParams::new(12, 3).with_probability(1.0);
        let seq = generate_sequence(params, &ALPHABET, &mut rng).unwrap();
        assert_eq!(seq.match_count, 9);
    }

    #[test]
    fn test_accidental_matches_are_counted() {
        // Two-symbol alphabet with no forced copies still produces chance repeats.
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let params = SequenceParams::new(200, 1).with_probability(0.0);
        let seq = generate_sequence(params, &['X', 'Y'], &mut rng).unwrap();
        assert!(seq.match_count > 0);
        assert_eq!(seq.match_count, count_matches(&seq.symbols, 1));
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = generate_sequence(
            SequenceParams::new(15, 2),
            &ALPHABET,
            &mut ChaCha8Rng::seed_from_u64(42),
        )
        .unwrap();
        let b = generate_sequence(
            SequenceParams::new(15, 2),
            &ALPHABET,
            &mut ChaCha8Rng::seed_from_u64(42),
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_params_fail_fast() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(generate_sequence(SequenceParams::new(3, 3), &ALPHABET, &mut rng).is_err());
        assert!(generate_sequence(SequenceParams::new(5, 0), &ALPHABET, &mut rng).is_err());
        assert!(generate_sequence(SequenceParams::new(5, 1), &['A'], &mut rng).is_err());
        assert!(generate_sequence(
            SequenceParams::new(5, 1).with_probability(-0.1),
            &ALPHABET,
            &mut rng
        )
        .is_err());
    }

    #[test]
    fn test_classify_response() {
        let seq = ['A', 'B', 'A', 'C'];
        // Before `level` a response can only be a false alarm.
        assert_eq!(classify_response(&seq, 2, 0, true), TrialOutcome::FalseAlarm);
        assert_eq!(classify_response(&seq, 2, 1, false), TrialOutcome::CorrectRejection);
        assert_eq!(classify_response(&seq, 2, 2, true), TrialOutcome::Hit);
        assert_eq!(classify_response(&seq, 2, 2, false), TrialOutcome::Miss);
        assert_eq!(classify_response(&seq, 2, 3, true), TrialOutcome::FalseAlarm);
        assert_eq!(classify_response(&seq, 2, 3, false), TrialOutcome::CorrectRejection);
        assert_eq!(classify_response(&seq, 2, 9, true), TrialOutcome::FalseAlarm);
    }
}
