//! N-back working-memory task
//!
//! Sequence generation with a ground-truth match count, response
//! classification, accuracy scoring and the timed session controller.
//!
//! Flow: start → stimulus timer / responses → Results → finish_session
//! (promotion + session record).

pub mod scoring;
pub mod sequence;
pub mod session;
pub mod types;

pub use scoring::calculate_accuracy;
pub use sequence::{classify_response, count_matches, generate_sequence, is_match, SequenceParams};
pub use session::NBackSession;
pub use types::{
    NBackCompletion, NBackMetrics, NBackPhase, NBackSequence, ResponseCounts, TrialOutcome,
    TrialRecord,
};
