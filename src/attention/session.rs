//! Attention session controller
//!
//! `Intro → Running(1) → Rest → Running(2) → … → Results → Finished`.
//!
//! Each frame of a running set steps the object field, feeds the newest raw
//! gaze sample through the smoother and lets the dwell accumulator decide
//! whether the cursor is on the target. A per-second countdown ends the set;
//! the gaze subscription is dropped at that moment so nothing is consumed
//! during rest or after the session ends.

use crate::attention::dwell::DwellAccumulator;
use crate::attention::field::ObjectField;
use crate::attention::gaze_source::GazeSubscription;
use crate::attention::smoothing::GazeSmoother;
use crate::attention::types::{
    AssetSet, AttentionCompletion, AttentionMetrics, AttentionPhase, MovingObject, TracePoint,
};
use crate::config::{AttentionConfig, TrainingConfig};
use crate::error::TrainingError;
use crate::promotion::{apply_promotion, PromotionPolicy};
use crate::scheduler::{Countdown, Tick, TickControl};
use crate::store::CompletionContext;
use crate::types::{GazeSample, Level, Participant, Point, TaskArea, TaskKind};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info};

/// Decimated, bounded trace of smoothed in-bounds gaze points
#[derive(Debug, Clone, Default)]
pub struct GazeTrace {
    stride: usize,
    limit: usize,
    seen: usize,
    points: Vec<TracePoint>,
}

impl GazeTrace {
    pub fn new(stride: usize, limit: usize) -> Self {
        Self {
            stride: stride.max(1),
            limit,
            seen: 0,
            points: Vec::new(),
        }
    }

    /// Offer one point; every `stride`-th offer is kept until the limit is hit.
    pub fn record(&mut self, p: Point) {
        self.seen += 1;
        if self.seen % self.stride == 0 && self.points.len() < self.limit {
            self.points.push(TracePoint {
                x: p.x.round() as i64,
                y: p.y.round() as i64,
            });
        }
    }

    pub fn points(&self) -> &[TracePoint] {
        &self.points
    }

    pub fn clear(&mut self) {
        self.seen = 0;
        self.points.clear();
    }
}

/// Stateful gaze-tracking attention session
#[derive(Debug)]
pub struct AttentionSession {
    config: AttentionConfig,
    promotion: PromotionPolicy,
    level: Level,
    assets: AssetSet,
    phase: AttentionPhase,
    area: TaskArea,
    field: ObjectField,
    smoother: GazeSmoother,
    dwell: DwellAccumulator,
    subscription: Option<GazeSubscription>,
    /// Newest raw sample; reprocessed on ticks where the source is silent
    last_sample: Option<GazeSample>,
    cursor_visible: bool,
    set_timer: Countdown,
    rest_timer: Countdown,
    current_set: u32,
    sets_completed: u32,
    trace: GazeTrace,
    gaze_ticks: u64,
    held_ticks: u64,
    rng: ChaCha8Rng,
}

impl AttentionSession {
    pub fn new(config: &TrainingConfig, level: Level, assets: AssetSet) -> Result<Self, TrainingError> {
        Self::with_rng(config, level, assets, ChaCha8Rng::from_entropy())
    }

    /// Create a session whose object field is reproducible
    pub fn with_seed(
        config: &TrainingConfig,
        level: Level,
        assets: AssetSet,
        seed: u64,
    ) -> Result<Self, TrainingError> {
        Self::with_rng(config, level, assets, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(
        config: &TrainingConfig,
        level: Level,
        assets: AssetSet,
        rng: ChaCha8Rng,
    ) -> Result<Self, TrainingError> {
        config.validate()?;
        let attention = config.attention.clone();
        let area = attention.task_area();
        Ok(Self {
            smoother: GazeSmoother::new(&config.smoothing, area.center()),
            dwell: DwellAccumulator::new(attention.hit_tolerance),
            trace: GazeTrace::new(attention.gaze_trace_stride, attention.gaze_trace_limit),
            set_timer: Countdown::new(attention.set_duration_sec),
            rest_timer: Countdown::new(0),
            config: attention,
            promotion: config.attention_promotion.clone(),
            level,
            assets,
            phase: AttentionPhase::Intro,
            area,
            field: ObjectField::default(),
            subscription: None,
            last_sample: None,
            cursor_visible: false,
            current_set: 1,
            sets_completed: 0,
            gaze_ticks: 0,
            held_ticks: 0,
            rng,
        })
    }

    /// Move the task area on the page; its size stays as configured.
    pub fn place_task_area(&mut self, left: f64, top: f64) {
        self.area.left = left;
        self.area.top = top;
    }

    /// Start the next set, consuming gaze from `subscription` until it ends.
    ///
    /// Allowed from `Intro` and from `Rest` once the rest countdown is over.
    pub fn start_set(&mut self, subscription: GazeSubscription) -> Result<(), TrainingError> {
        let ready = match self.phase {
            AttentionPhase::Intro => true,
            AttentionPhase::Rest => self.rest_timer.is_done(),
            _ => false,
        };
        if !ready {
            return Err(TrainingError::InvalidState(format!(
                "cannot start attention set in phase {:?}",
                self.phase
            )));
        }

        self.field = ObjectField::spawn(
            self.level,
            &self.assets,
            self.config.task_width,
            self.config.task_height,
            self.config.object_size,
            &mut self.rng,
        );
        self.smoother.reset(self.area.center());
        self.last_sample = None;
        self.cursor_visible = false;
        self.subscription = Some(subscription);
        self.set_timer = Countdown::new(self.config.set_duration_sec);
        self.phase = AttentionPhase::Running;
        debug!(
            set = self.current_set,
            objects = self.field.objects().len(),
            "attention set started"
        );
        Ok(())
    }

    /// Advance the session by one frame of `delta_ms`.
    pub fn advance(&mut self, delta_ms: f64) -> AttentionPhase {
        match self.phase {
            AttentionPhase::Running => self.advance_running(delta_ms),
            AttentionPhase::Rest => {
                if self.rest_timer.advance(delta_ms) {
                    debug!(next_set = self.current_set, "rest finished");
                }
            }
            _ => {}
        }
        self.phase
    }

    fn advance_running(&mut self, delta_ms: f64) {
        self.field.step();

        if let Some(sample) = self.subscription.as_ref().and_then(GazeSubscription::latest) {
            self.last_sample = Some(sample);
        }
        let gaze = match self.last_sample {
            Some(sample) => {
                let step = self.smoother.update(self.area.to_relative(&sample));
                self.gaze_ticks += 1;
                if !step.moved {
                    self.held_ticks += 1;
                }
                self.cursor_visible = self.area.contains(step.position);
                if self.cursor_visible {
                    self.trace.record(step.position);
                }
                Some(step.position)
            }
            None => None,
        };

        let target = self.field.target_center();
        self.dwell.tick(delta_ms, gaze, target, &self.area);

        if self.set_timer.advance(delta_ms) {
            self.complete_set();
        }
    }

    fn complete_set(&mut self) {
        self.subscription = None;
        self.cursor_visible = false;
        self.sets_completed += 1;
        info!(
            set = self.current_set,
            accuracy = self.dwell.accuracy(),
            "attention set complete"
        );

        if self.sets_completed >= self.config.total_sets {
            self.field.clear();
            self.phase = AttentionPhase::Results;
        } else {
            self.current_set += 1;
            self.rest_timer = Countdown::new(self.config.rest_duration_sec);
            self.phase = AttentionPhase::Rest;
        }
    }

    /// Tear down: drop the gaze subscription, cancel timers, return to `Intro`.
    ///
    /// Elapsed and dwell time already accumulated are kept, including the
    /// part of an interrupted set that ran before the abort.
    pub fn abort(&mut self) {
        self.subscription = None;
        self.set_timer.cancel();
        self.rest_timer.cancel();
        if matches!(self.phase, AttentionPhase::Running | AttentionPhase::Rest) {
            self.field.clear();
            self.cursor_visible = false;
            self.phase = AttentionPhase::Intro;
        }
    }

    pub fn phase(&self) -> AttentionPhase {
        self.phase
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Task-area geometry, including its page offset
    pub fn task_area(&self) -> TaskArea {
        self.area
    }

    /// Set number currently running, or the next one during rest (1-based)
    pub fn current_set(&self) -> u32 {
        self.current_set
    }

    pub fn sets_completed(&self) -> u32 {
        self.sets_completed
    }

    pub fn objects(&self) -> &[MovingObject] {
        self.field.objects()
    }

    /// Smoothed cursor position, task-relative
    pub fn cursor(&self) -> Point {
        self.smoother.position()
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    pub fn is_target_locked(&self) -> bool {
        self.phase == AttentionPhase::Running && self.dwell.is_locked()
    }

    /// Target highlight during the opening seconds of a set
    pub fn hint_active(&self) -> bool {
        self.phase == AttentionPhase::Running
            && self.config.set_duration_sec - self.set_timer.seconds_left()
                < self.config.hint_duration_sec
    }

    pub fn seconds_left(&self) -> u32 {
        match self.phase {
            AttentionPhase::Running => self.set_timer.seconds_left(),
            _ => 0,
        }
    }

    pub fn rest_seconds_left(&self) -> u32 {
        match self.phase {
            AttentionPhase::Rest => self.rest_timer.seconds_left(),
            _ => 0,
        }
    }

    pub fn dwell(&self) -> &DwellAccumulator {
        &self.dwell
    }

    pub fn gaze_trace(&self) -> &[TracePoint] {
        self.trace.points()
    }

    /// Fraction of gaze ticks in which the deadzone held the cursor still
    pub fn gaze_stability(&self) -> f64 {
        if self.gaze_ticks == 0 {
            return 0.0;
        }
        self.held_ticks as f64 / self.gaze_ticks as f64
    }

    pub fn metrics(&self) -> AttentionMetrics {
        AttentionMetrics {
            task_duration_sec: self.dwell.elapsed_ms() / 1000.0,
            accuracy: self.dwell.accuracy(),
            gaze_stability: self.gaze_stability(),
            level: self.level,
            sets_completed: self.sets_completed,
        }
    }

    /// Finalize the session: promotion decision plus session record.
    ///
    /// Promotion follows `TrainingConfig::attention_promotion`, not
    /// `ctx.policy`. Only valid in `Results`; other calls return `None`. Store failures
    /// are logged and reflected in the completion.
    pub fn finish_session(
        &mut self,
        participant: &Participant,
        ctx: &mut CompletionContext<'_>,
    ) -> Option<AttentionCompletion> {
        if self.phase != AttentionPhase::Results {
            debug!(phase = ?self.phase, "finish_session ignored");
            return None;
        }
        self.phase = AttentionPhase::Finished;
        self.subscription = None;

        let metrics = self.metrics();
        info!(
            user_id = participant.user_id.as_str(),
            level = self.level.get(),
            accuracy = metrics.accuracy,
            task_duration_sec = metrics.task_duration_sec,
            "attention session complete"
        );

        let promotion = apply_promotion(
            &self.promotion,
            &mut *ctx.profile,
            &participant.user_id,
            TaskKind::Attention,
            self.level,
            metrics.accuracy,
        );

        let record = ctx
            .encoder
            .encode_attention(participant, &metrics, self.trace.points());
        let persisted = match ctx.log.append(record) {
            Ok(()) => true,
            Err(e) => {
                error!(user_id = participant.user_id.as_str(), error = %e, "failed to save attention session");
                false
            }
        };

        Some(AttentionCompletion {
            metrics,
            promotion,
            persisted,
        })
    }
}

impl Tick for AttentionSession {
    fn tick(&mut self, delta_ms: f64) -> TickControl {
        match self.advance(delta_ms) {
            AttentionPhase::Running => TickControl::Continue,
            AttentionPhase::Rest if !self.rest_timer.is_done() => TickControl::Continue,
            _ => TickControl::Stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attention::gaze_source::GazeHub;
    use crate::config::SmoothingConfig;
    use crate::encoder::SessionEncoder;
    use crate::promotion::{PromotionOutcome, PromotionPolicy};
    use crate::scheduler::FrameLoop;
    use crate::store::{MemoryProfileStore, MemorySessionLog, ProfileStore};
    use crate::types::Group;
    use pretty_assertions::assert_eq;

    fn short_config(total_sets: u32) -> TrainingConfig {
        TrainingConfig {
            attention: AttentionConfig {
                total_sets,
                set_duration_sec: 2,
                rest_duration_sec: 1,
                ..AttentionConfig::default()
            },
            ..TrainingConfig::default()
        }
    }

    fn assets() -> AssetSet {
        AssetSet::new("target.png", vec!["d1.png".to_string(), "d2.png".to_string()])
    }

    fn session(total_sets: u32) -> AttentionSession {
        AttentionSession::with_seed(&short_config(total_sets), Level::MIN, assets(), 21).unwrap()
    }

    /// Replace the spawned field with a target parked at the area center.
    fn park_target(s: &mut AttentionSession) {
        let target = MovingObject {
            id: "obj-0".to_string(),
            asset: "target.png".to_string(),
            is_target: true,
            x: 400.0,
            y: 250.0,
            vx: 0.0,
            vy: 0.0,
        };
        s.field = ObjectField::from_objects(vec![target], 800.0, 500.0, 120.0);
    }

    fn run_set(s: &mut AttentionSession, hub: &mut GazeHub, gaze: GazeSample) {
        while s.phase() == AttentionPhase::Running {
            hub.publish(gaze);
            s.advance(100.0);
        }
    }

    #[test]
    fn test_start_set_spawns_field() {
        let mut s = session(1);
        let mut hub = GazeHub::new();
        assert_eq!(s.phase(), AttentionPhase::Intro);
        s.start_set(hub.subscribe()).unwrap();
        assert_eq!(s.phase(), AttentionPhase::Running);
        assert_eq!(s.objects().len(), 6);
        assert_eq!(s.seconds_left(), 2);
        assert!(s.hint_active());
        assert!(s.start_set(hub.subscribe()).is_err());
    }

    #[test]
    fn test_gaze_on_target_accumulates_dwell() {
        let mut s = session(1);
        let mut hub = GazeHub::new();
        s.start_set(hub.subscribe()).unwrap();
        park_target(&mut s);

        hub.publish(GazeSample::new(400.0, 250.0, 0.0));
        s.advance(100.0);
        assert!(s.is_target_locked());
        assert!(s.cursor_visible());

        run_set(&mut s, &mut hub, GazeSample::new(400.0, 250.0, 0.0));
        assert_eq!(s.phase(), AttentionPhase::Results);
        let metrics = s.metrics();
        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.task_duration_sec, 2.0);
        assert_eq!(metrics.sets_completed, 1);
    }

    #[test]
    fn test_no_gaze_means_no_dwell() {
        let mut s = session(1);
        let mut hub = GazeHub::new();
        s.start_set(hub.subscribe()).unwrap();
        park_target(&mut s);
        for _ in 0..20 {
            s.advance(100.0);
        }
        assert_eq!(s.phase(), AttentionPhase::Results);
        assert_eq!(s.dwell().elapsed_ms(), 2000.0);
        assert_eq!(s.dwell().dwell_ms(), 0.0);
        assert_eq!(s.gaze_stability(), 0.0);
        assert!(s.gaze_trace().is_empty());
    }

    #[test]
    fn test_stalled_source_holds_last_sample() {
        let mut s = session(1);
        let mut hub = GazeHub::new();
        s.start_set(hub.subscribe()).unwrap();
        park_target(&mut s);

        hub.publish(GazeSample::new(400.0, 250.0, 0.0));
        s.advance(100.0);
        // Source goes silent; the last sample keeps the cursor on target.
        s.advance(100.0);
        s.advance(100.0);
        assert_eq!(s.dwell().dwell_ms(), 300.0);
        assert_eq!(s.cursor(), Point::new(400.0, 250.0));
    }

    #[test]
    fn test_rest_between_sets() {
        let mut s = session(2);
        let mut hub = GazeHub::new();
        s.start_set(hub.subscribe()).unwrap();
        run_set(&mut s, &mut hub, GazeSample::new(-500.0, -500.0, 0.0));

        assert_eq!(s.phase(), AttentionPhase::Rest);
        assert_eq!(s.current_set(), 2);
        assert_eq!(s.rest_seconds_left(), 1);
        assert!(!hub.publish(GazeSample::new(0.0, 0.0, 0.0)));
        assert!(s.start_set(hub.subscribe()).is_err());

        s.advance(1000.0);
        assert_eq!(s.rest_seconds_left(), 0);
        s.start_set(hub.subscribe()).unwrap();
        run_set(&mut s, &mut hub, GazeSample::new(-500.0, -500.0, 0.0));

        assert_eq!(s.phase(), AttentionPhase::Results);
        assert_eq!(s.sets_completed(), 2);
        assert_eq!(s.metrics().task_duration_sec, 4.0);
        assert!(!s.cursor_visible());
    }

    #[test]
    fn test_out_of_bounds_gaze_is_hidden_and_untraced() {
        let mut s = session(1);
        let mut hub = GazeHub::new();
        s.place_task_area(100.0, 50.0);
        s.start_set(hub.subscribe()).unwrap();
        for _ in 0..10 {
            hub.publish(GazeSample::new(-2000.0, -2000.0, 0.0));
            s.advance(16.0);
        }
        assert!(!s.cursor_visible());
        assert!(s.gaze_trace().is_empty());
        assert_eq!(s.dwell().dwell_ms(), 0.0);
    }

    #[test]
    fn test_trace_is_decimated() {
        let mut s = session(1);
        let mut hub = GazeHub::new();
        s.start_set(hub.subscribe()).unwrap();
        run_set(&mut s, &mut hub, GazeSample::new(400.0, 250.0, 0.0));
        // 20 in-bounds ticks, stride 10
        assert_eq!(s.gaze_trace(), &[TracePoint { x: 400, y: 250 }; 2]);
        // Constant gaze at the start position: held once the startup window is full.
        assert_eq!(s.gaze_stability(), 0.9);
    }

    #[test]
    fn test_frame_loop_stops_at_rest() {
        let mut s = session(2);
        let mut hub = GazeHub::new();
        s.start_set(hub.subscribe()).unwrap();
        let mut frame_loop = FrameLoop::new(s);
        frame_loop.start(0.0);
        let mut t = 0.0;
        while frame_loop.is_running() {
            t += 50.0;
            frame_loop.frame(t);
        }
        // set (2s) + rest (1s)
        assert_eq!(t, 3000.0);
        assert_eq!(frame_loop.task().phase(), AttentionPhase::Rest);
        assert_eq!(frame_loop.task().rest_seconds_left(), 0);
    }

    #[test]
    fn test_abort_stops_consumption() {
        let mut s = session(1);
        let mut hub = GazeHub::new();
        s.start_set(hub.subscribe()).unwrap();
        s.advance(100.0);
        s.abort();
        assert_eq!(s.phase(), AttentionPhase::Intro);
        assert!(!hub.publish(GazeSample::new(1.0, 1.0, 0.0)));
        s.advance(5000.0);
        assert_eq!(s.dwell().elapsed_ms(), 100.0);
    }

    #[test]
    fn test_finish_session_promotes_once() {
        let mut s = session(1);
        let mut hub = GazeHub::new();
        s.start_set(hub.subscribe()).unwrap();
        park_target(&mut s);
        run_set(&mut s, &mut hub, GazeSample::new(400.0, 250.0, 0.0));

        let mut profile = MemoryProfileStore::default();
        let mut log = MemorySessionLog::default();
        let encoder = SessionEncoder::new();
        let policy = PromotionPolicy::default();
        let mut ctx = CompletionContext {
            profile: &mut profile,
            log: &mut log,
            encoder: &encoder,
            policy: &policy,
        };
        let participant = Participant::new("user-2", Group::G2);

        let completion = s.finish_session(&participant, &mut ctx).unwrap();
        assert_eq!(
            completion.promotion,
            PromotionOutcome::Promoted {
                from: Level::MIN,
                to: Level::new(2).unwrap()
            }
        );
        assert!(completion.persisted);
        assert!(s.finish_session(&participant, &mut ctx).is_none());
        assert_eq!(s.phase(), AttentionPhase::Finished);
        assert_eq!(log.len(), 1);
        assert_eq!(
            profile.level("user-2", TaskKind::Attention).unwrap(),
            Some(Level::new(2).unwrap())
        );
    }

    fn finish_with_dwell(dwell_ms: f64) -> (AttentionCompletion, MemoryProfileStore) {
        let mut s = session(1);
        let mut hub = GazeHub::new();
        s.start_set(hub.subscribe()).unwrap();
        run_set(&mut s, &mut hub, GazeSample::new(-500.0, -500.0, 0.0));

        let center = Some(Point::new(400.0, 250.0));
        let area = s.task_area();
        s.dwell = DwellAccumulator::new(150.0);
        s.dwell.tick(dwell_ms, center, center, &area);
        s.dwell.tick(1000.0 - dwell_ms, None, center, &area);

        let mut profile = MemoryProfileStore::default();
        let mut log = MemorySessionLog::default();
        let encoder = SessionEncoder::new();
        let policy = PromotionPolicy::default();
        let mut ctx = CompletionContext {
            profile: &mut profile,
            log: &mut log,
            encoder: &encoder,
            policy: &policy,
        };
        let completion = s
            .finish_session(&Participant::new("user-3", Group::G2), &mut ctx)
            .unwrap();
        (completion, profile)
    }

    #[test]
    fn test_attention_below_server_threshold_stays() {
        let (completion, profile) = finish_with_dwell(820.0);
        assert_eq!(completion.metrics.accuracy, 0.82);
        assert_eq!(completion.promotion, PromotionOutcome::Unchanged { level: Level::MIN });
        assert_eq!(profile.level("user-3", TaskKind::Attention).unwrap(), None);
    }

    #[test]
    fn test_attention_at_server_threshold_promotes() {
        let (completion, profile) = finish_with_dwell(850.0);
        assert_eq!(completion.metrics.accuracy, 0.85);
        assert_eq!(completion.promotion.promoted_to(), Some(Level::new(2).unwrap()));
        assert_eq!(
            profile.level("user-3", TaskKind::Attention).unwrap(),
            Some(Level::new(2).unwrap())
        );
    }

    #[test]
    fn test_huge_delta_ends_set() {
        let mut s = session(1);
        let mut hub = GazeHub::new();
        s.start_set(hub.subscribe()).unwrap();
        assert_eq!(s.advance(1e300), AttentionPhase::Results);
        assert_eq!(s.sets_completed(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrainingConfig {
            smoothing: SmoothingConfig {
                window_size: 0,
                ..SmoothingConfig::default()
            },
            ..TrainingConfig::default()
        };
        assert!(AttentionSession::new(&config, Level::MIN, assets()).is_err());
    }
}
