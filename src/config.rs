//! Training configuration
//!
//! `TrainingConfig` is passed explicitly to every session controller. All
//! fields default to the values used by the reference study protocol, so a
//! partial JSON document only needs to name the fields it overrides.

use crate::error::TrainingError;
use crate::promotion::PromotionPolicy;
use crate::types::TaskArea;
use serde::{Deserialize, Serialize};

/// Default N-back stimulus alphabet
pub const DEFAULT_ALPHABET: &str = "ABCDHKLM";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub nback: NBackConfig,
    pub smoothing: SmoothingConfig,
    pub attention: AttentionConfig,
    /// N-back promotion rule
    pub promotion: PromotionPolicy,
    /// Attention promotion rule; attention levels follow the stricter
    /// server-side threshold
    pub attention_promotion: PromotionPolicy,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            nback: NBackConfig::default(),
            smoothing: SmoothingConfig::default(),
            attention: AttentionConfig::default(),
            promotion: PromotionPolicy::default(),
            attention_promotion: PromotionPolicy::server_mirror(),
        }
    }
}

impl TrainingConfig {
    /// Load configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, TrainingError> {
        let config: TrainingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), TrainingError> {
        self.nback.validate()?;
        self.smoothing.validate()?;
        self.attention.validate()?;
        self.promotion.validate()?;
        self.attention_promotion.validate()
    }
}

/// N-back task parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NBackConfig {
    /// Stimulus symbols, one per character
    pub alphabet: String,
    /// Stimuli per session
    pub sequence_length: usize,
    /// Time each stimulus stays on screen (ms)
    pub stimulus_duration_ms: u64,
    /// Chance that an eligible position copies the symbol `level` back
    pub forced_match_probability: f64,
}

impl Default for NBackConfig {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.to_string(),
            sequence_length: 15,
            stimulus_duration_ms: 2000,
            forced_match_probability: 0.3,
        }
    }
}

impl NBackConfig {
    pub fn alphabet_symbols(&self) -> Vec<char> {
        self.alphabet.chars().collect()
    }

    pub(crate) fn validate(&self) -> Result<(), TrainingError> {
        if self.alphabet.chars().count() < 2 {
            return Err(TrainingError::InvalidConfig(
                "nback.alphabet needs at least 2 symbols".to_string(),
            ));
        }
        if self.sequence_length < 2 {
            return Err(TrainingError::InvalidConfig(
                "nback.sequence_length must be at least 2".to_string(),
            ));
        }
        if self.stimulus_duration_ms == 0 {
            return Err(TrainingError::InvalidConfig(
                "nback.stimulus_duration_ms must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.forced_match_probability) {
            return Err(TrainingError::InvalidConfig(format!(
                "nback.forced_match_probability {} outside [0, 1]",
                self.forced_match_probability
            )));
        }
        Ok(())
    }
}

/// Gaze smoothing filter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Rolling window size for the arithmetic mean
    pub window_size: usize,
    /// Minimum step (task units) before the cursor is allowed to move
    pub deadzone: f64,
    /// Interpolation factor toward the windowed mean
    pub lerp_factor: f64,
    /// While the window holds fewer samples than this, the deadzone is bypassed
    pub startup_samples: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_size: 4,
            deadzone: 3.0,
            lerp_factor: 0.35,
            startup_samples: 3,
        }
    }
}

impl SmoothingConfig {
    fn validate(&self) -> Result<(), TrainingError> {
        if self.window_size == 0 {
            return Err(TrainingError::InvalidConfig(
                "smoothing.window_size must be positive".to_string(),
            ));
        }
        if !(self.lerp_factor > 0.0 && self.lerp_factor <= 1.0) {
            return Err(TrainingError::InvalidConfig(format!(
                "smoothing.lerp_factor {} outside (0, 1]",
                self.lerp_factor
            )));
        }
        if self.deadzone < 0.0 {
            return Err(TrainingError::InvalidConfig(
                "smoothing.deadzone must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Attention task parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    pub total_sets: u32,
    pub set_duration_sec: u32,
    pub rest_duration_sec: u32,
    /// Seconds at the start of each set during which the target is highlighted
    pub hint_duration_sec: u32,
    /// Gaze-to-target distance that counts as dwelling on the target
    pub hit_tolerance: f64,
    pub task_width: f64,
    pub task_height: f64,
    /// Edge length of a moving object
    pub object_size: f64,
    /// Maximum number of gaze points attached to a session record
    pub gaze_trace_limit: usize,
    /// Keep every n-th in-bounds smoothed point in the trace
    pub gaze_trace_stride: usize,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            total_sets: 3,
            set_duration_sec: 90,
            rest_duration_sec: 15,
            hint_duration_sec: 3,
            hit_tolerance: 150.0,
            task_width: 800.0,
            task_height: 500.0,
            object_size: 120.0,
            gaze_trace_limit: 500,
            gaze_trace_stride: 10,
        }
    }
}

impl AttentionConfig {
    /// Task area anchored at the page origin
    pub fn task_area(&self) -> TaskArea {
        TaskArea::new(0.0, 0.0, self.task_width, self.task_height)
    }

    fn validate(&self) -> Result<(), TrainingError> {
        if self.total_sets == 0 {
            return Err(TrainingError::InvalidConfig(
                "attention.total_sets must be positive".to_string(),
            ));
        }
        if self.set_duration_sec == 0 {
            return Err(TrainingError::InvalidConfig(
                "attention.set_duration_sec must be positive".to_string(),
            ));
        }
        if self.task_width <= 0.0 || self.task_height <= 0.0 {
            return Err(TrainingError::InvalidConfig(
                "attention task area must have positive size".to_string(),
            ));
        }
        if self.object_size >= self.task_width.min(self.task_height) {
            return Err(TrainingError::InvalidConfig(
                "attention.object_size does not fit the task area".to_string(),
            ));
        }
        if self.gaze_trace_stride == 0 {
            return Err(TrainingError::InvalidConfig(
                "attention.gaze_trace_stride must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
