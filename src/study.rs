//! Study administration rules
//!
//! Enrollment capacity, registration and questionnaire validation, and
//! sighting-report aggregation.

use crate::types::Group;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Participants allowed per experimental group
pub const MAX_PER_GROUP: u32 = 10;

/// Youngest admissible participant age
pub const MIN_AGE: u32 = 16;

/// Oldest admissible participant age
pub const MAX_AGE: u32 = 69;

/// Whether a group with `current_count` members accepts no one else
pub fn is_group_full(current_count: u32) -> bool {
    current_count >= MAX_PER_GROUP
}

/// Registration form completeness
pub fn validate_registration(name: &str, group: Option<Group>, email: &str) -> bool {
    !name.trim().is_empty() && group.is_some() && !email.is_empty()
}

/// A positive sighting needs a count of at least one and a confidence rating;
/// a negative report is always valid.
pub fn validate_sighting_report(has_sighted: bool, count: u32, confidence: u8) -> bool {
    if !has_sighted {
        return true;
    }
    count >= 1 && confidence != 0
}

/// Sum of daily sighting counts, missing days counting as zero
pub fn calculate_total_sightings(daily_counts: &[Option<u32>]) -> u64 {
    daily_counts
        .iter()
        .map(|c| u64::from(c.unwrap_or(0)))
        .fold(0, u64::saturating_add)
}

/// Why a demographics form was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemographicsError {
    #[error("age is required")]
    MissingAge,

    #[error("age must be between 16 and 69")]
    AgeOutOfRange,

    #[error("occupation must be at least 2 characters")]
    OccupationTooShort,
}

impl DemographicsError {
    /// Stable error code for questionnaire front ends
    pub fn code(&self) -> &'static str {
        match self {
            DemographicsError::MissingAge => "missing_age",
            DemographicsError::AgeOutOfRange => "age_out_of_range",
            DemographicsError::OccupationTooShort => "occupation_too_short",
        }
    }
}

/// Inclusion criteria for the pre-training questionnaire
pub fn validate_demographics(age: Option<u32>, occupation: &str) -> Result<(), DemographicsError> {
    let age = age.ok_or(DemographicsError::MissingAge)?;
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(DemographicsError::AgeOutOfRange);
    }
    if occupation.trim().chars().count() < 2 {
        return Err(DemographicsError::OccupationTooShort);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_capacity_boundary() {
        assert!(!is_group_full(0));
        assert!(!is_group_full(9));
        assert!(is_group_full(10));
        assert!(is_group_full(11));
    }

    #[test]
    fn test_validate_registration() {
        assert!(validate_registration("Mina", Some(Group::G2), "mina@example.com"));
        assert!(!validate_registration("   ", Some(Group::G2), "mina@example.com"));
        assert!(!validate_registration("Mina", None, "mina@example.com"));
        assert!(!validate_registration("Mina", Some(Group::G2), ""));
    }

    #[test]
    fn test_validate_sighting_report() {
        assert!(validate_sighting_report(false, 0, 0));
        assert!(validate_sighting_report(true, 2, 5));
        assert!(!validate_sighting_report(true, 0, 5));
        assert!(!validate_sighting_report(true, 3, 0));
    }

    #[test]
    fn test_total_sightings_treats_missing_as_zero() {
        assert_eq!(calculate_total_sightings(&[Some(1), Some(0), Some(3), None, Some(2)]), 6);
        assert_eq!(calculate_total_sightings(&[]), 0);
        assert_eq!(calculate_total_sightings(&[None, None]), 0);
    }

    #[test]
    fn test_total_sightings_large_counts_do_not_overflow() {
        assert_eq!(
            calculate_total_sightings(&[Some(u32::MAX), Some(u32::MAX), None, Some(2)]),
            2 * u64::from(u32::MAX) + 2
        );
    }

    #[test]
    fn test_validate_demographics() {
        assert_eq!(validate_demographics(Some(25), "nurse"), Ok(()));
        assert_eq!(validate_demographics(Some(16), "IT"), Ok(()));
        assert_eq!(validate_demographics(Some(69), "retired"), Ok(()));
        assert_eq!(
            validate_demographics(None, "nurse"),
            Err(DemographicsError::MissingAge)
        );
        assert_eq!(
            validate_demographics(Some(15), "student"),
            Err(DemographicsError::AgeOutOfRange)
        );
        assert_eq!(
            validate_demographics(Some(70), "retired"),
            Err(DemographicsError::AgeOutOfRange)
        );
        assert_eq!(
            validate_demographics(Some(30), " x "),
            Err(DemographicsError::OccupationTooShort)
        );
        assert_eq!(DemographicsError::MissingAge.code(), "missing_age");
    }
}
