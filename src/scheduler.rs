//! Cooperative tick scheduling
//!
//! Sessions run single-threaded: a frame callback supplies timestamps, and
//! fixed-interval timers (stimulus advance, per-second countdowns) are driven
//! from the elapsed time between frames. Cancellation is owned here, so a
//! cancelled timer or loop can never mutate session state again.

/// Whether a ticked task wants further frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// A task driven by elapsed time
pub trait Tick {
    fn tick(&mut self, delta_ms: f64) -> TickControl;
}

/// Fixed-period timer advanced by elapsed time
#[derive(Debug, Clone)]
pub struct Interval {
    period_ms: f64,
    accumulated_ms: f64,
    cancelled: bool,
}

impl Interval {
    pub fn new(period_ms: f64) -> Self {
        Self {
            period_ms: period_ms.max(f64::MIN_POSITIVE),
            accumulated_ms: 0.0,
            cancelled: false,
        }
    }

    /// Advance by `delta_ms` and return how many periods elapsed.
    ///
    /// Non-finite and non-positive deltas are ignored. The count saturates at
    /// `u32::MAX`.
    pub fn advance(&mut self, delta_ms: f64) -> u32 {
        if self.cancelled || !delta_ms.is_finite() || delta_ms <= 0.0 {
            return 0;
        }
        let total = self.accumulated_ms + delta_ms;
        if !total.is_finite() {
            self.accumulated_ms = 0.0;
            return u32::MAX;
        }
        let periods = (total / self.period_ms).floor();
        self.accumulated_ms = total % self.period_ms;
        periods.min(u32::MAX as f64) as u32
    }

    /// Time until the next firing
    pub fn remaining_ms(&self) -> f64 {
        self.period_ms - self.accumulated_ms
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Restart the period from zero and re-arm a cancelled timer
    pub fn reset(&mut self) {
        self.accumulated_ms = 0.0;
        self.cancelled = false;
    }
}

/// Whole-second countdown; reaching zero is sticky
#[derive(Debug, Clone)]
pub struct Countdown {
    seconds_left: u32,
    timer: Interval,
}

impl Countdown {
    pub fn new(seconds: u32) -> Self {
        Self {
            seconds_left: seconds,
            timer: Interval::new(1000.0),
        }
    }

    /// Advance and return `true` exactly once, when the countdown reaches zero.
    pub fn advance(&mut self, delta_ms: f64) -> bool {
        if self.seconds_left == 0 {
            return false;
        }
        let fired = self.timer.advance(delta_ms);
        self.seconds_left = self.seconds_left.saturating_sub(fired);
        if self.seconds_left == 0 {
            self.timer.cancel();
            return true;
        }
        false
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn is_done(&self) -> bool {
        self.seconds_left == 0
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
    }
}

/// Converts absolute frame timestamps into deltas
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn start(&mut self, now_ms: f64) {
        self.last_ms = Some(now_ms);
    }

    /// Delta since the previous frame; 0 for the first frame or a clock that went backwards.
    pub fn delta(&mut self, now_ms: f64) -> f64 {
        let delta = match self.last_ms {
            Some(last) if now_ms > last => now_ms - last,
            _ => 0.0,
        };
        self.last_ms = Some(now_ms);
        delta
    }

    pub fn stop(&mut self) {
        self.last_ms = None;
    }
}

/// Frame-driven loop that owns its task and its cancellation
#[derive(Debug)]
pub struct FrameLoop<T: Tick> {
    task: T,
    clock: FrameClock,
    running: bool,
}

impl<T: Tick> FrameLoop<T> {
    pub fn new(task: T) -> Self {
        Self {
            task,
            clock: FrameClock::default(),
            running: false,
        }
    }

    pub fn start(&mut self, now_ms: f64) {
        self.clock.start(now_ms);
        self.running = true;
    }

    /// Deliver one frame. Ignored unless the loop is running.
    pub fn frame(&mut self, now_ms: f64) -> TickControl {
        if !self.running {
            return TickControl::Stop;
        }
        let delta = self.clock.delta(now_ms);
        let control = self.task.tick(delta);
        if control == TickControl::Stop {
            self.cancel();
        }
        control
    }

    pub fn cancel(&mut self) {
        self.running = false;
        self.clock.stop();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn task_mut(&mut self) -> &mut T {
        &mut self.task
    }

    pub fn into_task(self) -> T {
        self.task
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        total: f64,
        stop_after: f64,
    }

    impl Tick for Counter {
        fn tick(&mut self, delta_ms: f64) -> TickControl {
            self.total += delta_ms;
            if self.total >= self.stop_after {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        }
    }

    #[test]
    fn test_interval_fires_per_period() {
        let mut interval = Interval::new(2000.0);
        assert_eq!(interval.advance(1500.0), 0);
        assert_eq!(interval.advance(600.0), 1);
        assert_eq!(interval.advance(4000.0), 2);
        assert!((interval.remaining_ms() - 1900.0).abs() < 1e-9);
    }

    #[test]
    fn test_cancelled_interval_never_fires() {
        let mut interval = Interval::new(10.0);
        interval.cancel();
        assert_eq!(interval.advance(100.0), 0);
        interval.reset();
        assert_eq!(interval.advance(10.0), 1);
    }

    #[test]
    fn test_interval_ignores_negative_and_nan() {
        let mut interval = Interval::new(10.0);
        assert_eq!(interval.advance(-50.0), 0);
        assert_eq!(interval.advance(f64::NAN), 0);
        assert_eq!(interval.advance(f64::INFINITY), 0);
        assert_eq!(interval.advance(10.0), 1);
    }

    #[test]
    fn test_interval_huge_delta_returns_immediately() {
        let mut interval = Interval::new(2000.0);
        assert_eq!(interval.advance(1e300), u32::MAX);
        assert!(interval.remaining_ms() > 0.0);
        assert!(interval.remaining_ms() <= 2000.0);

        let mut interval = Interval::new(2000.0);
        assert_eq!(interval.advance(2000.0 * 5_000_000_000.0), u32::MAX);
    }

    #[test]
    fn test_interval_zero_period_saturates() {
        let mut interval = Interval::new(0.0);
        assert_eq!(interval.advance(16.0), u32::MAX);
    }

    #[test]
    fn test_countdown_huge_delta() {
        let mut countdown = Countdown::new(90);
        assert!(countdown.advance(1e300));
        assert!(countdown.is_done());
    }

    #[test]
    fn test_countdown_reaches_zero_once() {
        let mut countdown = Countdown::new(3);
        assert!(!countdown.advance(2500.0));
        assert_eq!(countdown.seconds_left(), 1);
        assert!(countdown.advance(500.0));
        assert!(countdown.is_done());
        assert!(!countdown.advance(5000.0));
    }

    #[test]
    fn test_frame_clock() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.delta(100.0), 0.0);
        assert_eq!(clock.delta(116.0), 16.0);
        assert_eq!(clock.delta(110.0), 0.0);
        clock.start(200.0);
        assert_eq!(clock.delta(216.5), 16.5);
    }

    #[test]
    fn test_frame_loop_stops_and_ignores_later_frames() {
        let mut frame_loop = FrameLoop::new(Counter {
            total: 0.0,
            stop_after: 50.0,
        });
        assert_eq!(frame_loop.frame(0.0), TickControl::Stop);

        frame_loop.start(0.0);
        assert_eq!(frame_loop.frame(20.0), TickControl::Continue);
        assert_eq!(frame_loop.frame(40.0), TickControl::Continue);
        assert_eq!(frame_loop.frame(60.0), TickControl::Stop);
        assert!(!frame_loop.is_running());

        frame_loop.frame(1000.0);
        assert_eq!(frame_loop.task().total, 60.0);
    }

    #[test]
    fn test_frame_loop_cancel() {
        let mut frame_loop = FrameLoop::new(Counter {
            total: 0.0,
            stop_after: f64::MAX,
        });
        frame_loop.start(0.0);
        frame_loop.frame(10.0);
        frame_loop.cancel();
        frame_loop.frame(20.0);
        assert_eq!(frame_loop.into_task().total, 10.0);
    }
}
