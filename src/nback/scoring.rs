//! N-back accuracy scoring

/// Accuracy of a session: `min(1, hits / possible_matches)`.
///
/// A sequence without matches scores 0 regardless of hits, and hits beyond
/// the number of matches never push accuracy above 1.
pub fn calculate_accuracy(hits: u32, possible_matches: u32) -> f64 {
    if possible_matches == 0 {
        return 0.0;
    }
    (hits as f64 / possible_matches as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_exact() {
        assert_eq!(calculate_accuracy(8, 10), 0.8);
        assert_eq!(calculate_accuracy(0, 4), 0.0);
        assert_eq!(calculate_accuracy(3, 3), 1.0);
    }

    #[test]
    fn test_accuracy_capped() {
        assert_eq!(calculate_accuracy(11, 10), 1.0);
    }

    #[test]
    fn test_accuracy_no_matches() {
        assert_eq!(calculate_accuracy(0, 0), 0.0);
        assert_eq!(calculate_accuracy(5, 0), 0.0);
    }
}
