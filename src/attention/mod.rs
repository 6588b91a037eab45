//! Gaze-based sustained-attention task
//!
//! Raw gaze samples arrive through a single-subscriber channel, are smoothed
//! into a stable cursor and compared against a bouncing target each frame.
//! Time on target over total running time is the session accuracy.

pub mod dwell;
pub mod field;
pub mod gaze_source;
pub mod session;
pub mod smoothing;
pub mod types;

pub use dwell::DwellAccumulator;
pub use field::ObjectField;
pub use gaze_source::{GazeHub, GazeSubscription};
pub use session::{AttentionSession, GazeTrace};
pub use smoothing::{GazeSmoother, SmoothingStep};
pub use types::{
    AssetSet, AttentionCompletion, AttentionMetrics, AttentionPhase, DifficultyProfile,
    MovingObject, TracePoint, PLACEHOLDER_ASSET,
};
