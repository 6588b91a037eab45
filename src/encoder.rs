//! Session record encoding
//!
//! Wraps finalized session metrics in the envelope handed to the session
//! log: record id, participant, submission time and producer metadata.

use crate::attention::types::{AttentionMetrics, TracePoint};
use crate::nback::types::{NBackMetrics, TrialRecord};
use crate::types::{Group, Participant, TaskKind};
use crate::{COGTRAIN_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Task-specific record body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionPayload {
    #[serde(rename = "nback")]
    NBack {
        metrics: NBackMetrics,
        trials: Vec<TrialRecord>,
    },
    Attention {
        metrics: AttentionMetrics,
        gaze_stream: Vec<TracePoint>,
    },
}

/// One finalized session, as written to the session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub record_id: String,
    pub user_id: String,
    pub group: Group,
    pub task: TaskKind,
    pub submitted_at: DateTime<Utc>,
    pub producer: Producer,
    pub metrics: SessionPayload,
}

impl SessionRecord {
    /// Accuracy regardless of task
    pub fn accuracy(&self) -> f64 {
        match &self.metrics {
            SessionPayload::NBack { metrics, .. } => metrics.accuracy,
            SessionPayload::Attention { metrics, .. } => metrics.accuracy,
        }
    }
}

/// Builds session records stamped with this producer instance
#[derive(Debug, Clone)]
pub struct SessionEncoder {
    instance_id: String,
}

impl Default for SessionEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEncoder {
    /// Create an encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn encode_nback(
        &self,
        participant: &Participant,
        metrics: &NBackMetrics,
        trials: &[TrialRecord],
    ) -> SessionRecord {
        self.envelope(
            participant,
            TaskKind::NBack,
            SessionPayload::NBack {
                metrics: metrics.clone(),
                trials: trials.to_vec(),
            },
        )
    }

    pub fn encode_attention(
        &self,
        participant: &Participant,
        metrics: &AttentionMetrics,
        gaze_stream: &[TracePoint],
    ) -> SessionRecord {
        self.envelope(
            participant,
            TaskKind::Attention,
            SessionPayload::Attention {
                metrics: metrics.clone(),
                gaze_stream: gaze_stream.to_vec(),
            },
        )
    }

    fn envelope(
        &self,
        participant: &Participant,
        task: TaskKind,
        metrics: SessionPayload,
    ) -> SessionRecord {
        SessionRecord {
            record_id: Uuid::new_v4().to_string(),
            user_id: participant.user_id.clone(),
            group: participant.group,
            task,
            submitted_at: Utc::now(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: COGTRAIN_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nback::types::TrialOutcome;
    use crate::types::Level;

    fn nback_metrics() -> NBackMetrics {
        NBackMetrics {
            group: Group::G4,
            level: Level::new(2).unwrap(),
            accuracy: 0.5,
            hits: 1,
            misses: 1,
            false_alarms: 0,
            possible_matches: 2,
        }
    }

    #[test]
    fn test_encode_nback_record() {
        let encoder = SessionEncoder::with_instance_id("test-instance".to_string());
        let participant = Participant::new("user-9", Group::G4);
        let trials = vec![TrialRecord {
            index: 2,
            stimulus: 'A',
            outcome: TrialOutcome::Hit,
        }];
        let record = encoder.encode_nback(&participant, &nback_metrics(), &trials);

        assert_eq!(record.user_id, "user-9");
        assert_eq!(record.group, Group::G4);
        assert_eq!(record.task, TaskKind::NBack);
        assert_eq!(record.producer.name, PRODUCER_NAME);
        assert_eq!(record.producer.version, COGTRAIN_VERSION);
        assert_eq!(record.producer.instance_id, "test-instance");
        assert_eq!(record.accuracy(), 0.5);
        assert!(Uuid::parse_str(&record.record_id).is_ok());
    }

    #[test]
    fn test_record_ids_are_unique() {
        let encoder = SessionEncoder::new();
        let participant = Participant::new("user-9", Group::G1);
        let a = encoder.encode_nback(&participant, &nback_metrics(), &[]);
        let b = encoder.encode_nback(&participant, &nback_metrics(), &[]);
        assert_ne!(a.record_id, b.record_id);
        assert_eq!(a.producer.instance_id, b.producer.instance_id);
    }

    #[test]
    fn test_attention_record_json_shape() {
        let encoder = SessionEncoder::new();
        let participant = Participant::new("user-3", Group::G2);
        let metrics = AttentionMetrics {
            task_duration_sec: 270.0,
            accuracy: 0.62,
            gaze_stability: 0.85,
            level: Level::MIN,
            sets_completed: 3,
        };
        let record = encoder.encode_attention(&participant, &metrics, &[TracePoint { x: 10, y: 20 }]);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["task"], "attention");
        assert_eq!(json["group"], "G2");
        assert_eq!(json["metrics"]["kind"], "attention");
        assert_eq!(json["metrics"]["metrics"]["sets_completed"], 3);
        assert_eq!(json["metrics"]["gaze_stream"][0]["x"], 10);
        assert!(json["submitted_at"].is_string());

        let back: SessionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
