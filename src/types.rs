//! Core types shared by the N-back and attention tasks
//!
//! This module defines the identifiers, geometry and difficulty types that flow
//! between the session controllers and their external collaborators.

use crate::error::TrainingError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Training task identifier (also the key under which a profile stores its level)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Gaze-tracked multiple-object attention task
    Attention,
    /// Letter N-back working-memory task
    #[serde(rename = "nback")]
    NBack,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Attention => "attention",
            TaskKind::NBack => "nback",
        }
    }

    /// Profile field that holds the level for this task
    pub fn level_key(&self) -> &'static str {
        match self {
            TaskKind::Attention => "trainingLevels.g2_attention",
            TaskKind::NBack => "trainingLevels.g4_nback",
        }
    }
}

/// Experimental group a participant is assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    G1,
    G2,
    G3,
    G4,
}

impl Group {
    pub fn as_str(&self) -> &'static str {
        match self {
            Group::G1 => "G1",
            Group::G2 => "G2",
            Group::G3 => "G3",
            Group::G4 => "G4",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "G1" => Some(Group::G1),
            "G2" => Some(Group::G2),
            "G3" => Some(Group::G3),
            "G4" => Some(Group::G4),
            _ => None,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity attached to every persisted session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub group: Group,
}

impl Participant {
    pub fn new(user_id: impl Into<String>, group: Group) -> Self {
        Self {
            user_id: user_id.into(),
            group,
        }
    }
}

/// Difficulty level, always within `[Level::MIN, Level::MAX]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Level(u8);

impl Level {
    pub const MIN: Level = Level(1);
    pub const MAX: Level = Level(3);

    pub fn new(value: u32) -> Result<Self, TrainingError> {
        if (Self::MIN.0 as u32..=Self::MAX.0 as u32).contains(&value) {
            Ok(Level(value as u8))
        } else {
            Err(TrainingError::InvalidLevel(value))
        }
    }

    /// Level read from a profile field that may be missing or zero.
    pub fn from_stored(value: Option<u32>) -> Self {
        value
            .and_then(|v| Self::new(v).ok())
            .unwrap_or(Self::MIN)
    }

    pub fn get(&self) -> u32 {
        self.0 as u32
    }

    /// The next level up, or `None` at the maximum. There is no demotion.
    pub fn next(&self) -> Option<Level> {
        if *self < Self::MAX {
            Some(Level(self.0 + 1))
        } else {
            None
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u32> for Level {
    type Error = TrainingError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Level::new(value)
    }
}

impl From<Level> for u32 {
    fn from(level: Level) -> Self {
        level.get()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point in task-area or page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Linear interpolation `a + (b - a) * t` on both axes
    pub fn lerp(&self, target: Point, t: f64) -> Point {
        Point {
            x: lerp(self.x, target.x, t),
            y: lerp(self.y, target.y, t),
        }
    }
}

/// Linear interpolation between two scalars
pub fn lerp(start: f64, end: f64, factor: f64) -> f64 {
    start + (end - start) * factor
}

/// Raw gaze estimate in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    /// Estimator timestamp in milliseconds
    #[serde(default)]
    pub timestamp: f64,
}

impl GazeSample {
    pub fn new(x: f64, y: f64, timestamp: f64) -> Self {
        Self { x, y, timestamp }
    }
}

/// Placement of the task area on the page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskArea {
    /// Page x of the left edge
    #[serde(default)]
    pub left: f64,
    /// Page y of the top edge
    #[serde(default)]
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl TaskArea {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Convert a page-coordinate sample into task-area-relative coordinates
    pub fn to_relative(&self, sample: &GazeSample) -> Point {
        Point::new(sample.x - self.left, sample.y - self.top)
    }

    /// Whether a relative point lies within the area (edges inclusive)
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0.0 && p.x <= self.width && p.y >= 0.0 && p.y <= self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_bounds() {
        assert!(Level::new(0).is_err());
        assert!(Level::new(4).is_err());
        assert_eq!(Level::new(2).unwrap().get(), 2);
        assert_eq!(Level::MIN.next(), Some(Level::new(2).unwrap()));
        assert_eq!(Level::MAX.next(), None);
    }

    #[test]
    fn test_level_from_stored_defaults_to_min() {
        assert_eq!(Level::from_stored(None), Level::MIN);
        assert_eq!(Level::from_stored(Some(0)), Level::MIN);
        assert_eq!(Level::from_stored(Some(3)), Level::MAX);
    }

    #[test]
    fn test_level_serde() {
        let json = serde_json::to_string(&Level::new(2).unwrap()).unwrap();
        assert_eq!(json, "2");
        assert!(serde_json::from_str::<Level>("7").is_err());
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 10.0, 0.35), 3.5);
        let p = Point::new(0.0, 0.0).lerp(Point::new(10.0, -10.0), 0.5);
        assert_eq!(p, Point::new(5.0, -5.0));
    }

    #[test]
    fn test_task_area_relative_and_contains() {
        let area = TaskArea::new(100.0, 50.0, 800.0, 500.0);
        let p = area.to_relative(&GazeSample::new(150.0, 60.0, 0.0));
        assert_eq!(p, Point::new(50.0, 10.0));
        assert!(area.contains(p));
        assert!(area.contains(Point::new(800.0, 500.0)));
        assert!(!area.contains(Point::new(-0.1, 10.0)));
        assert_eq!(area.center(), Point::new(400.0, 250.0));
    }

    #[test]
    fn test_group_parse() {
        assert_eq!(Group::parse("g2"), Some(Group::G2));
        assert_eq!(Group::parse("G5"), None);
    }
}
