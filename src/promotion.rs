//! Difficulty promotion
//!
//! A session at or above the accuracy threshold moves the participant one
//! level up, capped at the maximum level. There is no demotion path.

use crate::error::TrainingError;
use crate::store::ProfileStore;
use crate::types::{Level, TaskKind};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Accuracy required for promotion in the client-side session controllers
pub const PROMOTION_THRESHOLD: f64 = 0.8;

/// Threshold used by the server-side promotion mirror
pub const SERVER_PROMOTION_THRESHOLD: f64 = 0.85;

/// Promotion rule: `accuracy >= threshold && level < max_level`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionPolicy {
    pub threshold: f64,
    pub max_level: u32,
}

impl Default for PromotionPolicy {
    fn default() -> Self {
        Self {
            threshold: PROMOTION_THRESHOLD,
            max_level: Level::MAX.get(),
        }
    }
}

impl PromotionPolicy {
    /// Policy applied when session records are re-evaluated server-side
    pub fn server_mirror() -> Self {
        Self {
            threshold: SERVER_PROMOTION_THRESHOLD,
            ..Self::default()
        }
    }

    pub fn should_level_up(&self, accuracy: f64, current_level: u32) -> bool {
        accuracy >= self.threshold && current_level < self.max_level
    }

    /// The level after this session, or `None` when it stays unchanged
    pub fn next_level(&self, accuracy: f64, current: Level) -> Option<Level> {
        if self.should_level_up(accuracy, current.get()) {
            current.next()
        } else {
            None
        }
    }

    pub(crate) fn validate(&self) -> Result<(), TrainingError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(TrainingError::InvalidConfig(format!(
                "promotion.threshold {} outside [0, 1]",
                self.threshold
            )));
        }
        if !(Level::MIN.get()..=Level::MAX.get()).contains(&self.max_level) {
            return Err(TrainingError::InvalidConfig(format!(
                "promotion.max_level {} outside [{}, {}]",
                self.max_level,
                Level::MIN,
                Level::MAX
            )));
        }
        Ok(())
    }
}

/// Promotion decision with the default client-side policy
pub fn should_level_up(accuracy: f64, current_level: u32) -> bool {
    PromotionPolicy::default().should_level_up(accuracy, current_level)
}

/// Result of applying a promotion decision to the profile store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PromotionOutcome {
    Promoted { from: Level, to: Level },
    Unchanged { level: Level },
    /// The decision was to promote but the profile write failed
    Failed { attempted: Level },
}

impl PromotionOutcome {
    pub fn promoted_to(&self) -> Option<Level> {
        match self {
            PromotionOutcome::Promoted { to, .. } => Some(*to),
            _ => None,
        }
    }
}

/// Decide on promotion and write the new level through the profile store.
///
/// Store failures are logged and reported as `Failed`; they never abort the
/// caller's completion flow.
pub fn apply_promotion(
    policy: &PromotionPolicy,
    store: &mut dyn ProfileStore,
    user_id: &str,
    task: TaskKind,
    current: Level,
    accuracy: f64,
) -> PromotionOutcome {
    let Some(next) = policy.next_level(accuracy, current) else {
        info!(user_id, task = task.as_str(), level = current.get(), "no promotion");
        return PromotionOutcome::Unchanged { level: current };
    };

    match store.set_level(user_id, task, next) {
        Ok(()) => {
            info!(
                user_id,
                task = task.as_str(),
                from = current.get(),
                to = next.get(),
                "level up"
            );
            PromotionOutcome::Promoted {
                from: current,
                to: next,
            }
        }
        Err(e) => {
            error!(user_id, task = task.as_str(), error = %e, "level up failed");
            PromotionOutcome::Failed { attempted: next }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryProfileStore;

    struct BrokenProfile;

    impl ProfileStore for BrokenProfile {
        fn level(&self, _user_id: &str, _task: TaskKind) -> Result<Option<Level>, StoreError> {
            Ok(None)
        }

        fn set_level(&mut self, _: &str, _: TaskKind, _: Level) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("offline".to_string()))
        }
    }

    #[test]
    fn test_should_level_up_boundaries() {
        assert!(should_level_up(0.8, 1));
        assert!(!should_level_up(0.79, 1));
        assert!(!should_level_up(0.79999, 2));
        assert!(!should_level_up(0.9, 3));
        assert!(!should_level_up(1.0, 3));
    }

    #[test]
    fn test_server_mirror_is_stricter() {
        let server = PromotionPolicy::server_mirror();
        assert!(!server.should_level_up(0.84, 1));
        assert!(server.should_level_up(0.85, 1));
    }

    #[test]
    fn test_apply_promotion_writes_level() {
        let mut store = MemoryProfileStore::default();
        let outcome = apply_promotion(
            &PromotionPolicy::default(),
            &mut store,
            "u1",
            TaskKind::NBack,
            Level::MIN,
            0.9,
        );
        let two = Level::new(2).unwrap();
        assert_eq!(outcome.promoted_to(), Some(two));
        assert_eq!(store.level("u1", TaskKind::NBack).unwrap(), Some(two));
    }

    #[test]
    fn test_apply_promotion_unchanged_does_not_write() {
        let mut store = MemoryProfileStore::default();
        let outcome = apply_promotion(
            &PromotionPolicy::default(),
            &mut store,
            "u1",
            TaskKind::Attention,
            Level::MAX,
            1.0,
        );
        assert_eq!(outcome, PromotionOutcome::Unchanged { level: Level::MAX });
        assert_eq!(store.level("u1", TaskKind::Attention).unwrap(), None);
    }

    #[test]
    fn test_apply_promotion_store_failure_is_reported() {
        let outcome = apply_promotion(
            &PromotionPolicy::default(),
            &mut BrokenProfile,
            "u1",
            TaskKind::NBack,
            Level::MIN,
            1.0,
        );
        assert_eq!(
            outcome,
            PromotionOutcome::Failed {
                attempted: Level::new(2).unwrap()
            }
        );
    }
}
