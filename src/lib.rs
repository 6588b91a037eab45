//! Cogtrain - scoring and adaptation core for cognitive-training tasks
//!
//! Two independent subsystems share the same shape (stateful session +
//! streaming scorer):
//!
//! - **N-back**: stimulus sequence generation with a ground-truth match count,
//!   response classification, accuracy scoring and difficulty promotion.
//! - **Attention**: gaze smoothing (windowed mean + deadzone-gated
//!   interpolation) and time-on-target accumulation against a moving target.
//!
//! Sessions never persist anything themselves. Finalized metrics flow to a
//! `ProfileStore` (levels) and a `SessionLog` (records) supplied by the host.

pub mod attention;
pub mod config;
pub mod encoder;
pub mod error;
pub mod nback;
pub mod pipeline;
pub mod promotion;
pub mod scheduler;
pub mod store;
pub mod study;
pub mod types;

#[cfg(feature = "cli")]
pub mod logging;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use attention::{AttentionSession, DwellAccumulator, GazeHub, GazeSmoother};
pub use config::TrainingConfig;
pub use encoder::{SessionEncoder, SessionRecord};
pub use error::{StoreError, TrainingError};
pub use nback::{calculate_accuracy, count_matches, generate_sequence, NBackSession};
pub use pipeline::{attention_replay_to_json, nback_replay_to_json, TrainingProcessor};
pub use promotion::{should_level_up, PromotionOutcome, PromotionPolicy};
pub use store::{MemoryProfileStore, MemorySessionLog, ProfileStore, SessionLog};
pub use study::{calculate_total_sightings, is_group_full, MAX_PER_GROUP};
pub use types::{GazeSample, Group, Level, Participant, Point, TaskArea, TaskKind};

/// Library version embedded in every session record
pub const COGTRAIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for session records
pub const PRODUCER_NAME: &str = "cogtrain";
