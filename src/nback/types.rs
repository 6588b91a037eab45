//! N-back data types
//!
//! Stimulus sequences, per-trial outcomes and the finalized session metrics
//! that flow from the session controller to the session log.

use crate::promotion::PromotionOutcome;
use crate::types::{Group, Level};
use serde::{Deserialize, Serialize};

/// Signal-detection outcome of one displayed stimulus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialOutcome {
    /// Match shown, participant responded
    Hit,
    /// Match shown, no response before the deadline
    Miss,
    /// Non-match shown, participant responded
    FalseAlarm,
    /// Non-match shown, no response
    CorrectRejection,
}

impl TrialOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialOutcome::Hit => "hit",
            TrialOutcome::Miss => "miss",
            TrialOutcome::FalseAlarm => "false_alarm",
            TrialOutcome::CorrectRejection => "correct_rejection",
        }
    }
}

/// A generated stimulus sequence together with its realized match count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NBackSequence {
    /// N-back distance
    pub level: usize,
    /// Stimuli in display order
    pub symbols: Vec<char>,
    /// Positions `i >= level` with `symbols[i] == symbols[i - level]`,
    /// counted on the realized sequence
    pub match_count: u32,
}

impl NBackSequence {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<char> {
        self.symbols.get(index).copied()
    }
}

/// Running hit / miss / false-alarm counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCounts {
    pub hits: u32,
    pub misses: u32,
    pub false_alarms: u32,
}

impl ResponseCounts {
    pub fn record(&mut self, outcome: TrialOutcome) {
        match outcome {
            TrialOutcome::Hit => self.hits += 1,
            TrialOutcome::Miss => self.misses += 1,
            TrialOutcome::FalseAlarm => self.false_alarms += 1,
            TrialOutcome::CorrectRejection => {}
        }
    }
}

/// Outcome of a single stimulus, kept for the session trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub index: usize,
    pub stimulus: char,
    pub outcome: TrialOutcome,
}

/// Session controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NBackPhase {
    Intro,
    Running,
    Results,
    /// `finish_session` has run; further calls are no-ops
    Finished,
}

/// Finalized N-back session metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NBackMetrics {
    pub group: Group,
    pub level: Level,
    /// `min(1, hits / possible_matches)`, 0 when there were no matches
    pub accuracy: f64,
    pub hits: u32,
    pub misses: u32,
    pub false_alarms: u32,
    pub possible_matches: u32,
}

/// What `finish_session` hands back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NBackCompletion {
    pub metrics: NBackMetrics,
    pub promotion: PromotionOutcome,
    /// Whether the session log accepted the record
    pub persisted: bool,
}
