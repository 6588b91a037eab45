//! Attention task data types

use crate::promotion::PromotionOutcome;
use crate::types::{Level, Point};
use serde::{Deserialize, Serialize};

/// Asset id used when the provider supplies no distractor images
pub const PLACEHOLDER_ASSET: &str = "placeholder";

/// Image identities for the moving objects, supplied by an asset provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSet {
    pub target: String,
    #[serde(default)]
    pub distractors: Vec<String>,
}

impl AssetSet {
    pub fn new(target: impl Into<String>, distractors: Vec<String>) -> Self {
        Self {
            target: target.into(),
            distractors,
        }
    }
}

/// An object bouncing around the task area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingObject {
    pub id: String,
    /// Asset identity (image URL or key)
    pub asset: String,
    pub is_target: bool,
    pub x: f64,
    pub y: f64,
    /// Velocity in task units per frame
    pub vx: f64,
    pub vy: f64,
}

impl MovingObject {
    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Object count and speed for a difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    pub distractors: usize,
    /// Base speed in task units per frame
    pub speed: f64,
}

impl DifficultyProfile {
    pub fn for_level(level: Level) -> Self {
        match level.get() {
            1 => Self {
                distractors: 5,
                speed: 3.3,
            },
            2 => Self {
                distractors: 7,
                speed: 4.8,
            },
            _ => Self {
                distractors: 9,
                speed: 6.8,
            },
        }
    }
}

/// Attention session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionPhase {
    Intro,
    Running,
    Rest,
    Results,
    /// `finish_session` has run; further calls are no-ops
    Finished,
}

/// Rounded smoothed gaze position kept for the session record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracePoint {
    pub x: i64,
    pub y: i64,
}

/// Finalized attention session metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionMetrics {
    /// Total time spent in running sets (seconds)
    pub task_duration_sec: f64,
    /// Time on target divided by total running time
    pub accuracy: f64,
    /// Fraction of gaze ticks in which the deadzone held the cursor still
    pub gaze_stability: f64,
    pub level: Level,
    pub sets_completed: u32,
}

/// What `finish_session` hands back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionCompletion {
    pub metrics: AttentionMetrics,
    pub promotion: PromotionOutcome,
    /// Whether the session log accepted the record
    pub persisted: bool,
}
