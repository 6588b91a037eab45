//! Gaze smoothing filter
//!
//! Two stages, run once per animation tick:
//! 1. arithmetic mean over a small FIFO window of task-relative samples;
//! 2. interpolate the cursor toward that mean, committing the step only when
//!    it is larger than the deadzone.
//!
//! While the window is still filling up the deadzone is bypassed so the
//! cursor can leave its initial position. After that, sub-deadzone steps are
//! dropped, which anchors the cursor under constant small noise.

use crate::config::SmoothingConfig;
use crate::types::Point;
use std::collections::VecDeque;

/// Result of one smoothing step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingStep {
    /// Cursor position after the step
    pub position: Point,
    /// Whether the cursor moved this tick
    pub moved: bool,
}

/// Windowed-mean + deadzone-gated interpolation filter
#[derive(Debug, Clone)]
pub struct GazeSmoother {
    window_size: usize,
    deadzone: f64,
    lerp_factor: f64,
    startup_samples: usize,
    window: VecDeque<Point>,
    position: Point,
}

impl GazeSmoother {
    pub fn new(config: &SmoothingConfig, initial: Point) -> Self {
        let window_size = config.window_size.max(1);
        Self {
            window_size,
            deadzone: config.deadzone,
            lerp_factor: config.lerp_factor,
            startup_samples: config.startup_samples,
            window: VecDeque::with_capacity(window_size),
            position: initial,
        }
    }

    /// Empty the window and place the cursor at `initial`.
    pub fn reset(&mut self, initial: Point) {
        self.window.clear();
        self.position = initial;
    }

    /// Feed one task-relative sample and return the new cursor position.
    pub fn update(&mut self, sample: Point) -> SmoothingStep {
        self.window.push_back(sample);
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }

        let average = self.window_mean();
        let next = self.position.lerp(average, self.lerp_factor);
        let step = next.distance_to(self.position);

        let moved = step > self.deadzone || self.window.len() < self.startup_samples;
        if moved {
            self.position = next;
        }

        SmoothingStep {
            position: self.position,
            moved,
        }
    }

    /// Current cursor position
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    fn window_mean(&self) -> Point {
        let n = self.window.len() as f64;
        let (sx, sy) = self
            .window
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point::new(sx / n, sy / n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smoother_at(x: f64, y: f64) -> GazeSmoother {
        GazeSmoother::new(&SmoothingConfig::default(), Point::new(x, y))
    }

    #[test]
    fn test_first_step_interpolates() {
        let mut s = smoother_at(0.0, 0.0);
        let step = s.update(Point::new(100.0, 0.0));
        assert!(step.moved);
        assert!((step.position.x - 35.0).abs() < 1e-9);
        assert_eq!(step.position.y, 0.0);
    }

    #[test]
    fn test_window_is_fifo_and_bounded() {
        let mut s = smoother_at(0.0, 0.0);
        for i in 0..10 {
            s.update(Point::new(i as f64, 0.0));
        }
        assert_eq!(s.window_len(), 4);
        // mean of 6,7,8,9
        assert!((s.window_mean().x - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_startup_bypass_ignores_deadzone() {
        let mut s = smoother_at(0.0, 0.0);
        // Step of 0.35 is far below the deadzone but the window is still filling.
        assert!(s.update(Point::new(1.0, 0.0)).moved);
        assert!(s.update(Point::new(1.0, 0.0)).moved);
        // Third sample fills the startup window; a tiny step is suppressed now.
        let step = s.update(Point::new(1.0, 0.0));
        assert!(!step.moved);
    }

    #[test]
    fn test_small_jitter_is_suppressed() {
        let mut s = smoother_at(200.0, 200.0);
        for _ in 0..3 {
            s.update(Point::new(200.0, 200.0));
        }
        let anchored = s.position();
        for i in 0..50 {
            let jitter = if i % 2 == 0 { 2.0 } else { -2.0 };
            let step = s.update(Point::new(200.0 + jitter, 200.0 - jitter));
            assert!(!step.moved);
        }
        assert_eq!(s.position(), anchored);
    }

    #[test]
    fn test_large_motion_passes_deadzone() {
        let mut s = smoother_at(0.0, 0.0);
        for _ in 0..4 {
            s.update(Point::new(0.0, 0.0));
        }
        let step = s.update(Point::new(400.0, 300.0));
        assert!(step.moved);
        assert!(step.position.x > 0.0 && step.position.y > 0.0);
    }

    #[test]
    fn test_reset_clears_window() {
        let mut s = smoother_at(0.0, 0.0);
        s.update(Point::new(10.0, 10.0));
        s.reset(Point::new(400.0, 250.0));
        assert_eq!(s.window_len(), 0);
        assert_eq!(s.position(), Point::new(400.0, 250.0));
    }
}
