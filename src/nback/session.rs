//! N-back session controller
//!
//! `Intro → Running → Results → Finished`. While running, a fixed
//! per-stimulus timer advances through the sequence. The first response to a
//! stimulus is scored immediately; a match that is still unanswered when its
//! timer fires is scored as a miss before the next stimulus becomes active.

use crate::config::NBackConfig;
use crate::error::TrainingError;
use crate::nback::scoring::calculate_accuracy;
use crate::nback::sequence::{classify_response, count_matches, generate_sequence, SequenceParams};
use crate::nback::types::{
    NBackCompletion, NBackMetrics, NBackPhase, NBackSequence, ResponseCounts, TrialOutcome,
    TrialRecord,
};
use crate::promotion::apply_promotion;
use crate::scheduler::{Interval, Tick, TickControl};
use crate::store::CompletionContext;
use crate::types::{Group, Level, Participant, TaskKind};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info};

/// Stateful N-back session
#[derive(Debug)]
pub struct NBackSession {
    config: NBackConfig,
    alphabet: Vec<char>,
    level: Level,
    phase: NBackPhase,
    sequence: NBackSequence,
    current_index: usize,
    /// Response already registered for the current stimulus
    pending: Option<TrialOutcome>,
    counts: ResponseCounts,
    trials: Vec<TrialRecord>,
    stimulus_timer: Interval,
    rng: ChaCha8Rng,
}

impl NBackSession {
    /// Create a session seeded from OS entropy
    pub fn new(config: &NBackConfig, level: Level) -> Result<Self, TrainingError> {
        Self::with_rng(config, level, ChaCha8Rng::from_entropy())
    }

    /// Create a session with a reproducible stimulus sequence
    pub fn with_seed(config: &NBackConfig, level: Level, seed: u64) -> Result<Self, TrainingError> {
        Self::with_rng(config, level, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: &NBackConfig, level: Level, rng: ChaCha8Rng) -> Result<Self, TrainingError> {
        config.validate()?;
        let alphabet = config.alphabet_symbols();
        if config.sequence_length <= level.get() as usize {
            return Err(TrainingError::InvalidSequenceParams(format!(
                "length {} must exceed level {}",
                config.sequence_length, level
            )));
        }

        Ok(Self {
            config: config.clone(),
            alphabet,
            level,
            phase: NBackPhase::Intro,
            sequence: NBackSequence {
                level: level.get() as usize,
                symbols: Vec::new(),
                match_count: 0,
            },
            current_index: 0,
            pending: None,
            counts: ResponseCounts::default(),
            trials: Vec::new(),
            stimulus_timer: Interval::new(config.stimulus_duration_ms as f64),
            rng,
        })
    }

    /// Reset counters, generate a fresh sequence and show the first stimulus.
    pub fn start(&mut self) -> Result<(), TrainingError> {
        self.ensure_phase(NBackPhase::Intro, "start")?;
        let params = SequenceParams::new(self.config.sequence_length, self.level.get() as usize)
            .with_probability(self.config.forced_match_probability);
        let sequence = generate_sequence(params, &self.alphabet, &mut self.rng)?;
        self.begin(sequence);
        Ok(())
    }

    /// Start with a pre-recorded stimulus sequence (replays and tests).
    pub fn start_with_symbols(&mut self, symbols: Vec<char>) -> Result<(), TrainingError> {
        self.ensure_phase(NBackPhase::Intro, "start")?;
        let level = self.level.get() as usize;
        if symbols.len() <= level {
            return Err(TrainingError::InvalidSequenceParams(format!(
                "length {} must exceed level {}",
                symbols.len(),
                level
            )));
        }
        let match_count = count_matches(&symbols, level);
        self.begin(NBackSequence {
            level,
            symbols,
            match_count,
        });
        Ok(())
    }

    fn begin(&mut self, sequence: NBackSequence) {
        debug!(
            level = self.level.get(),
            possible_matches = sequence.match_count,
            "n-back session started"
        );
        self.sequence = sequence;
        self.counts = ResponseCounts::default();
        self.trials.clear();
        self.current_index = 0;
        self.pending = None;
        self.stimulus_timer.reset();
        self.phase = NBackPhase::Running;
    }

    fn ensure_phase(&self, expected: NBackPhase, action: &str) -> Result<(), TrainingError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(TrainingError::InvalidState(format!(
                "cannot {} n-back session in phase {:?}",
                action, self.phase
            )))
        }
    }

    /// Register a "match" response for the current stimulus.
    ///
    /// Only the first response per stimulus counts; later ones (and any
    /// response outside `Running`) are ignored and return `None`.
    pub fn respond(&mut self) -> Option<TrialOutcome> {
        if self.phase != NBackPhase::Running || self.pending.is_some() {
            return None;
        }
        let outcome = classify_response(
            &self.sequence.symbols,
            self.sequence.level,
            self.current_index,
            true,
        );
        self.counts.record(outcome);
        self.pending = Some(outcome);
        Some(outcome)
    }

    /// Advance the stimulus timer by `delta_ms`, expiring every stimulus whose
    /// display time elapsed.
    pub fn advance(&mut self, delta_ms: f64) -> NBackPhase {
        let fired = self.stimulus_timer.advance(delta_ms);
        for _ in 0..fired {
            if self.phase != NBackPhase::Running {
                break;
            }
            self.expire_stimulus();
        }
        self.phase
    }

    /// Close the current stimulus: score an unanswered match as a miss, then
    /// move to the next stimulus (or to `Results` after the last one).
    pub fn expire_stimulus(&mut self) {
        if self.phase != NBackPhase::Running {
            return;
        }
        let index = self.current_index;
        let outcome = match self.pending {
            Some(outcome) => outcome,
            None => {
                let outcome =
                    classify_response(&self.sequence.symbols, self.sequence.level, index, false);
                self.counts.record(outcome);
                outcome
            }
        };
        if let Some(stimulus) = self.sequence.get(index) {
            self.trials.push(TrialRecord {
                index,
                stimulus,
                outcome,
            });
        }

        self.current_index += 1;
        self.pending = None;
        if self.current_index >= self.sequence.len() {
            self.stimulus_timer.cancel();
            self.phase = NBackPhase::Results;
        }
    }

    /// Tear down mid-session: cancel the timer and return to `Intro`.
    pub fn abort(&mut self) {
        self.stimulus_timer.cancel();
        if matches!(self.phase, NBackPhase::Running | NBackPhase::Results) {
            self.phase = NBackPhase::Intro;
            self.pending = None;
        }
    }

    pub fn phase(&self) -> NBackPhase {
        self.phase
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn sequence(&self) -> &NBackSequence {
        &self.sequence
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Stimulus currently on screen
    pub fn current_stimulus(&self) -> Option<char> {
        if self.phase == NBackPhase::Running {
            self.sequence.get(self.current_index)
        } else {
            None
        }
    }

    /// Feedback for the current stimulus, if a response was registered
    pub fn feedback(&self) -> Option<TrialOutcome> {
        self.pending
    }

    pub fn counts(&self) -> ResponseCounts {
        self.counts
    }

    pub fn possible_matches(&self) -> u32 {
        self.sequence.match_count
    }

    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    pub fn accuracy(&self) -> f64 {
        calculate_accuracy(self.counts.hits, self.sequence.match_count)
    }

    /// Metrics as they stand now
    pub fn metrics(&self, group: Group) -> NBackMetrics {
        NBackMetrics {
            group,
            level: self.level,
            accuracy: self.accuracy(),
            hits: self.counts.hits,
            misses: self.counts.misses,
            false_alarms: self.counts.false_alarms,
            possible_matches: self.sequence.match_count,
        }
    }

    /// Finalize the session: decide on promotion, write the session record and
    /// return the metrics.
    ///
    /// Only valid in `Results`; any other call (including a second call) is a
    /// no-op returning `None`. Store failures are logged and reflected in the
    /// completion, never returned as errors.
    pub fn finish_session(
        &mut self,
        participant: &Participant,
        ctx: &mut CompletionContext<'_>,
    ) -> Option<NBackCompletion> {
        if self.phase != NBackPhase::Results {
            debug!(phase = ?self.phase, "finish_session ignored");
            return None;
        }
        self.phase = NBackPhase::Finished;

        let metrics = self.metrics(participant.group);
        info!(
            user_id = participant.user_id.as_str(),
            level = self.level.get(),
            accuracy = metrics.accuracy,
            hits = metrics.hits,
            possible_matches = metrics.possible_matches,
            "n-back session complete"
        );

        let promotion = apply_promotion(
            ctx.policy,
            &mut *ctx.profile,
            &participant.user_id,
            TaskKind::NBack,
            self.level,
            metrics.accuracy,
        );

        let record = ctx.encoder.encode_nback(participant, &metrics, &self.trials);
        let persisted = match ctx.log.append(record) {
            Ok(()) => true,
            Err(e) => {
                error!(user_id = participant.user_id.as_str(), error = %e, "failed to save n-back session");
                false
            }
        };

        Some(NBackCompletion {
            metrics,
            promotion,
            persisted,
        })
    }
}

impl Tick for NBackSession {
    fn tick(&mut self, delta_ms: f64) -> TickControl {
        match self.advance(delta_ms) {
            NBackPhase::Running => TickControl::Continue,
            _ => TickControl::Stop,
        }
    }
}
