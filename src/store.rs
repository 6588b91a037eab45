//! External collaborators: profile store and session log
//!
//! The session controllers never own persistence. They read the current level
//! from a `ProfileStore`, write a new one on promotion, and hand finalized
//! records to a `SessionLog`. The in-memory implementations back the CLI,
//! the FFI processor and the tests.

use crate::encoder::{SessionEncoder, SessionRecord};
use crate::error::StoreError;
use crate::promotion::PromotionPolicy;
use crate::types::{Level, TaskKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-participant difficulty levels
pub trait ProfileStore {
    /// Current level for a task, `None` when the profile has no entry yet
    fn level(&self, user_id: &str, task: TaskKind) -> Result<Option<Level>, StoreError>;

    fn set_level(&mut self, user_id: &str, task: TaskKind, level: Level) -> Result<(), StoreError>;
}

/// Append-only log of finalized session records
pub trait SessionLog {
    fn append(&mut self, record: SessionRecord) -> Result<(), StoreError>;
}

/// Everything a session controller needs to finalize a session
pub struct CompletionContext<'a> {
    pub profile: &'a mut dyn ProfileStore,
    pub log: &'a mut dyn SessionLog,
    pub encoder: &'a SessionEncoder,
    /// N-back promotion policy; attention sessions carry their own
    pub policy: &'a PromotionPolicy,
}

/// In-memory profile store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryProfileStore {
    levels: HashMap<String, HashMap<TaskKind, Level>>,
}

impl MemoryProfileStore {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn participant_count(&self) -> usize {
        self.levels.len()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn level(&self, user_id: &str, task: TaskKind) -> Result<Option<Level>, StoreError> {
        Ok(self
            .levels
            .get(user_id)
            .and_then(|tasks| tasks.get(&task))
            .copied())
    }

    fn set_level(&mut self, user_id: &str, task: TaskKind, level: Level) -> Result<(), StoreError> {
        self.levels
            .entry(user_id.to_string())
            .or_default()
            .insert(task, level);
        Ok(())
    }
}

/// In-memory session log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySessionLog {
    records: Vec<SessionRecord>,
}

impl MemorySessionLog {
    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    pub fn records_for<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a SessionRecord> {
        self.records.iter().filter(move |r| r.user_id == user_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_ndjson(&self) -> Result<String, serde_json::Error> {
        let mut lines = Vec::with_capacity(self.records.len());
        for record in &self.records {
            lines.push(serde_json::to_string(record)?);
        }
        Ok(lines.join("\n"))
    }
}

impl SessionLog for MemorySessionLog {
    fn append(&mut self, record: SessionRecord) -> Result<(), StoreError> {
        self.records.push(record);
        Ok(())
    }
}
