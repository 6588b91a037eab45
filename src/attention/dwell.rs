//! Dwell-time accumulation
//!
//! Every running tick adds its duration to the elapsed total. When the
//! smoothed gaze lies inside the task area and within the hit tolerance of
//! the target's center, the same duration is added to the dwell total.
//! Totals accumulate across all sets of a session, so accuracy is time
//! weighted rather than averaged per set.

use crate::types::{Point, TaskArea};
use serde::{Deserialize, Serialize};

/// Time-on-target accumulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellAccumulator {
    tolerance: f64,
    elapsed_ms: f64,
    dwell_ms: f64,
    locked: bool,
}

impl DwellAccumulator {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            elapsed_ms: 0.0,
            dwell_ms: 0.0,
            locked: false,
        }
    }

    /// Account for one tick and return whether the gaze is locked on the target.
    ///
    /// `gaze` and `target` are task-relative; a missing gaze (no sample yet)
    /// or a missing target never locks.
    pub fn tick(
        &mut self,
        delta_ms: f64,
        gaze: Option<Point>,
        target: Option<Point>,
        area: &TaskArea,
    ) -> bool {
        let delta = if delta_ms.is_finite() && delta_ms > 0.0 {
            delta_ms
        } else {
            0.0
        };
        self.elapsed_ms += delta;

        self.locked = match (gaze, target) {
            (Some(g), Some(t)) => area.contains(g) && g.distance_to(t) < self.tolerance,
            _ => false,
        };
        if self.locked {
            self.dwell_ms += delta;
        }
        self.locked
    }

    /// `dwell / elapsed`, 0 before any time has elapsed
    pub fn accuracy(&self) -> f64 {
        if self.elapsed_ms <= 0.0 {
            return 0.0;
        }
        self.dwell_ms / self.elapsed_ms
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn dwell_ms(&self) -> f64 {
        self.dwell_ms
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn reset(&mut self) {
        self.elapsed_ms = 0.0;
        self.dwell_ms = 0.0;
        self.locked = false;
    }
}
