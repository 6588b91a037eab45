//! Replay pipeline
//!
//! Public JSON-in/JSON-out API. Recorded sessions are replayed through the
//! same scoring code the live controllers use:
//!
//! - N-back: `{level, sequence, responses}` → session controller → metrics
//! - Attention: `{level, task_area, frames}` → smoother → dwell accumulator
//!
//! `TrainingProcessor` is the stateful counterpart that owns configuration,
//! the profile store and the session log, and completes sessions end to end.

use crate::attention::dwell::DwellAccumulator;
use crate::attention::session::AttentionSession;
use crate::attention::smoothing::GazeSmoother;
use crate::attention::types::{AssetSet, AttentionCompletion};
use crate::config::TrainingConfig;
use crate::encoder::SessionEncoder;
use crate::error::TrainingError;
use crate::nback::session::NBackSession;
use crate::nback::types::{NBackCompletion, NBackPhase, TrialRecord};
use crate::promotion::PromotionPolicy;
use crate::store::{CompletionContext, MemoryProfileStore, MemorySessionLog, ProfileStore, SessionLog};
use crate::types::{GazeSample, Level, Participant, Point, TaskKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// Recorded N-back session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NBackReplay {
    pub level: u32,
    /// Stimuli in display order
    pub sequence: Vec<char>,
    /// Stimulus indices at which the participant responded
    #[serde(default)]
    pub responses: Vec<usize>,
}

/// Scored N-back replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NBackReplayReport {
    pub level: Level,
    pub accuracy: f64,
    pub hits: u32,
    pub misses: u32,
    pub false_alarms: u32,
    pub possible_matches: u32,
    pub should_level_up: bool,
    pub trials: Vec<TrialRecord>,
}

/// Page offset of the task area
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaOrigin {
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
}

/// One recorded animation frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub dt_ms: f64,
    /// Raw gaze sample delivered since the previous frame (page coordinates)
    #[serde(default)]
    pub gaze: Option<GazeSample>,
    /// Target center this frame (task-relative)
    #[serde(default)]
    pub target: Option<Point>,
}

/// Recorded attention session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionReplay {
    pub level: u32,
    #[serde(default)]
    pub task_area: AreaOrigin,
    pub frames: Vec<ReplayFrame>,
}

/// Scored attention replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionReplayReport {
    pub level: Level,
    pub task_duration_sec: f64,
    pub accuracy: f64,
    pub gaze_stability: f64,
    pub locked_frames: usize,
    pub should_level_up: bool,
    /// Smoothed cursor after the last frame (task-relative)
    pub final_cursor: Point,
}

/// Score a recorded N-back session and return the report as JSON.
///
/// # Example
/// ```ignore
/// let report = nback_replay_to_json(
///     r#"{"level": 2, "sequence": ["A","B","A","B","C"], "responses": [2, 3]}"#.to_string(),
/// )?;
/// ```
pub fn nback_replay_to_json(raw_json: String) -> Result<String, TrainingError> {
    let replay: NBackReplay = parse(&raw_json)?;
    let report = replay_nback(&TrainingConfig::default(), &replay)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Score a recorded attention session and return the report as JSON.
pub fn attention_replay_to_json(raw_json: String) -> Result<String, TrainingError> {
    let replay: AttentionReplay = parse(&raw_json)?;
    let report = replay_attention(&TrainingConfig::default(), &replay)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

fn parse<T: for<'de> Deserialize<'de>>(raw_json: &str) -> Result<T, TrainingError> {
    serde_json::from_str(raw_json).map_err(|e| TrainingError::ParseError(e.to_string()))
}

/// Replay an N-back session through the session controller
pub fn replay_nback(config: &TrainingConfig, replay: &NBackReplay) -> Result<NBackReplayReport, TrainingError> {
    let level = Level::new(replay.level)?;
    let session = run_nback(config, level, replay)?;
    let counts = session.counts();
    let accuracy = session.accuracy();
    let report = NBackReplayReport {
        level,
        accuracy,
        hits: counts.hits,
        misses: counts.misses,
        false_alarms: counts.false_alarms,
        possible_matches: session.possible_matches(),
        should_level_up: config.promotion.should_level_up(accuracy, level.get()),
        trials: session.trials().to_vec(),
    };
    Ok(report)
}

/// Drive a fresh session through every stimulus of the replay; it ends in `Results`.
fn run_nback(
    config: &TrainingConfig,
    level: Level,
    replay: &NBackReplay,
) -> Result<NBackSession, TrainingError> {
    let mut session = NBackSession::with_seed(&config.nback, level, 0)?;
    session.start_with_symbols(replay.sequence.clone())?;

    let responses: BTreeSet<usize> = replay.responses.iter().copied().collect();
    while session.phase() == NBackPhase::Running {
        if responses.contains(&session.current_index()) {
            session.respond();
        }
        session.expire_stimulus();
    }
    Ok(session)
}

/// Replay recorded frames through gaze smoothing and dwell accumulation.
///
/// A frame without gaze reuses the newest earlier sample, as a live session
/// does when the estimator stalls.
pub fn replay_attention(
    config: &TrainingConfig,
    replay: &AttentionReplay,
) -> Result<AttentionReplayReport, TrainingError> {
    config.validate()?;
    let level = Level::new(replay.level)?;
    let mut area = config.attention.task_area();
    area.left = replay.task_area.left;
    area.top = replay.task_area.top;

    let mut smoother = GazeSmoother::new(&config.smoothing, area.center());
    let mut dwell = DwellAccumulator::new(config.attention.hit_tolerance);
    let mut last_sample: Option<GazeSample> = None;
    let (mut gaze_ticks, mut held_ticks, mut locked_frames) = (0usize, 0usize, 0usize);

    for frame in &replay.frames {
        if frame.gaze.is_some() {
            last_sample = frame.gaze;
        }
        let gaze = match last_sample {
            Some(sample) => {
                let step = smoother.update(area.to_relative(&sample));
                gaze_ticks += 1;
                if !step.moved {
                    held_ticks += 1;
                }
                Some(step.position)
            }
            None => None,
        };
        if dwell.tick(frame.dt_ms, gaze, frame.target, &area) {
            locked_frames += 1;
        }
    }

    let accuracy = dwell.accuracy();
    Ok(AttentionReplayReport {
        level,
        task_duration_sec: dwell.elapsed_ms() / 1000.0,
        accuracy,
        gaze_stability: if gaze_ticks == 0 {
            0.0
        } else {
            held_ticks as f64 / gaze_ticks as f64
        },
        locked_frames,
        should_level_up: config.attention_promotion.should_level_up(accuracy, level.get()),
        final_cursor: smoother.position(),
    })
}

/// Stateful processor owning configuration and the external stores.
///
/// Use this when levels should persist across sessions: new sessions start
/// at the participant's stored level and completions write promotions and
/// session records back.
pub struct TrainingProcessor<P: ProfileStore, L: SessionLog> {
    config: TrainingConfig,
    profile: P,
    log: L,
    encoder: SessionEncoder,
}

impl TrainingProcessor<MemoryProfileStore, MemorySessionLog> {
    /// Processor backed by in-memory stores
    pub fn in_memory(config: TrainingConfig) -> Result<Self, TrainingError> {
        Self::new(config, MemoryProfileStore::default(), MemorySessionLog::default())
    }

    /// Load profile levels from JSON
    pub fn load_profiles(&mut self, json: &str) -> Result<(), TrainingError> {
        self.profile =
            MemoryProfileStore::from_json(json).map_err(|e| TrainingError::ParseError(e.to_string()))?;
        Ok(())
    }

    /// Save profile levels to JSON
    pub fn save_profiles(&self) -> Result<String, TrainingError> {
        Ok(self.profile.to_json()?)
    }
}

impl<P: ProfileStore, L: SessionLog> TrainingProcessor<P, L> {
    pub fn new(config: TrainingConfig, profile: P, log: L) -> Result<Self, TrainingError> {
        config.validate()?;
        Ok(Self {
            config,
            profile,
            log,
            encoder: SessionEncoder::new(),
        })
    }

    pub fn with_encoder(mut self, encoder: SessionEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn policy(&self) -> &PromotionPolicy {
        &self.config.promotion
    }

    pub fn profile(&self) -> &P {
        &self.profile
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn into_parts(self) -> (P, L) {
        (self.profile, self.log)
    }

    /// Stored level for a task; unreadable or missing levels start at 1
    pub fn current_level(&self, user_id: &str, task: TaskKind) -> Level {
        match self.profile.level(user_id, task) {
            Ok(level) => level.unwrap_or_default(),
            Err(e) => {
                warn!(user_id, task = task.as_str(), error = %e, "level lookup failed, using level 1");
                Level::default()
            }
        }
    }

    /// New N-back session at the participant's stored level
    pub fn nback_session(&self, user_id: &str) -> Result<NBackSession, TrainingError> {
        NBackSession::new(&self.config.nback, self.current_level(user_id, TaskKind::NBack))
    }

    /// New attention session at the participant's stored level
    pub fn attention_session(
        &self,
        user_id: &str,
        assets: AssetSet,
    ) -> Result<AttentionSession, TrainingError> {
        AttentionSession::new(
            &self.config,
            self.current_level(user_id, TaskKind::Attention),
            assets,
        )
    }

    fn context(&mut self) -> CompletionContext<'_> {
        CompletionContext {
            profile: &mut self.profile,
            log: &mut self.log,
            encoder: &self.encoder,
            policy: &self.config.promotion,
        }
    }

    pub fn complete_nback(
        &mut self,
        participant: &Participant,
        session: &mut NBackSession,
    ) -> Option<NBackCompletion> {
        let mut ctx = self.context();
        session.finish_session(participant, &mut ctx)
    }

    pub fn complete_attention(
        &mut self,
        participant: &Participant,
        session: &mut AttentionSession,
    ) -> Option<AttentionCompletion> {
        let mut ctx = self.context();
        session.finish_session(participant, &mut ctx)
    }

    /// Replay a recorded N-back session and complete it through the stores.
    ///
    /// Returns the completion (metrics, promotion, persistence) as JSON.
    pub fn process_nback_replay(
        &mut self,
        participant: &Participant,
        raw_json: &str,
    ) -> Result<String, TrainingError> {
        let replay: NBackReplay = parse(raw_json)?;
        let level = Level::new(replay.level)?;
        let mut session = run_nback(&self.config, level, &replay)?;
        let completion = self.complete_nback(participant, &mut session).ok_or_else(|| {
            TrainingError::InvalidState("replayed session did not reach results".to_string())
        })?;
        Ok(serde_json::to_string_pretty(&completion)?)
    }
}
