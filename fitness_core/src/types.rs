//! Core domain types for FitnessX workout sessions.
//!
//! This module defines the fundamental types used throughout the system:
//! - Coordinates and position samples
//! - Moments and their media handles
//! - Session status, workout types and session records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Position Types
// ============================================================================

/// A WGS84 coordinate in degrees
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and inside the latitude/longitude ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One coordinate reading with the instant it was taken
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct PositionSample {
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
}

impl PositionSample {
    pub fn new(coordinate: Coordinate, timestamp: DateTime<Utc>) -> Self {
        Self {
            coordinate,
            timestamp,
        }
    }
}

// ============================================================================
// Moment Types
// ============================================================================

/// Kind of media attached to a moment
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

/// Opaque reference to media persisted by the media collaborator
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaRef {
    pub name: String,
    pub kind: MediaKind,
}

impl MediaRef {
    pub fn photo(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MediaKind::Photo,
        }
    }
}

/// A timestamped, geotagged capture made during an active session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MomentRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub coordinate: Coordinate,
    pub media: MediaRef,
}

// ============================================================================
// Session Types
// ============================================================================

/// Lifecycle status of a workout session
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Active,
    Paused,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Category of workout activity
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    Running,
    Walking,
    Cycling,
    Strength,
    Hiit,
    Yoga,
    Swimming,
}

impl WorkoutType {
    pub const ALL: [WorkoutType; 7] = [
        WorkoutType::Running,
        WorkoutType::Walking,
        WorkoutType::Cycling,
        WorkoutType::Strength,
        WorkoutType::Hiit,
        WorkoutType::Yoga,
        WorkoutType::Swimming,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            WorkoutType::Running => "Running",
            WorkoutType::Walking => "Walking",
            WorkoutType::Cycling => "Cycling",
            WorkoutType::Strength => "Strength",
            WorkoutType::Hiit => "HIIT",
            WorkoutType::Yoga => "Yoga",
            WorkoutType::Swimming => "Swimming",
        }
    }

    /// Tracked with the position stream
    pub fn uses_gps(&self) -> bool {
        matches!(
            self,
            WorkoutType::Running | WorkoutType::Walking | WorkoutType::Cycling | WorkoutType::Swimming
        )
    }

    /// Driven by the guided exercise player
    pub fn is_exercise_based(&self) -> bool {
        !self.uses_gps()
    }

    /// Parse a lowercase name as used on the command line and in config
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "running" | "run" => Some(WorkoutType::Running),
            "walking" | "walk" => Some(WorkoutType::Walking),
            "cycling" | "ride" => Some(WorkoutType::Cycling),
            "strength" => Some(WorkoutType::Strength),
            "hiit" => Some(WorkoutType::Hiit),
            "yoga" => Some(WorkoutType::Yoga),
            "swimming" | "swim" => Some(WorkoutType::Swimming),
            _ => None,
        }
    }
}

/// The session currently owned by the controller
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub samples: Vec<PositionSample>,
    pub moments: Vec<MomentRecord>,
    pub status: SessionStatus,
    pub workout_type: Option<WorkoutType>,
}

impl WorkoutSession {
    pub fn begin(start_time: DateTime<Utc>, workout_type: Option<WorkoutType>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time,
            end_time: None,
            samples: Vec::new(),
            moments: Vec::new(),
            status: SessionStatus::Active,
            workout_type,
        }
    }

    /// Wall-clock span between start and end (includes paused time)
    pub fn wall_duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Read-only record of a finished session
///
/// Built once by the controller when a session ends and never mutated again.
#[derive(Clone, Debug, Serialize)]
pub struct CompletedSession {
    session: WorkoutSession,
    active_seconds: f64,
    distance_meters: f64,
}

impl CompletedSession {
    pub(crate) fn seal(session: WorkoutSession, active: Duration, distance_meters: f64) -> Self {
        Self {
            session,
            active_seconds: active.num_milliseconds() as f64 / 1000.0,
            distance_meters,
        }
    }

    pub fn id(&self) -> Uuid {
        self.session.id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.session.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.session.end_time
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn workout_type(&self) -> Option<WorkoutType> {
        self.session.workout_type
    }

    pub fn samples(&self) -> &[PositionSample] {
        &self.session.samples
    }

    pub fn moments(&self) -> &[MomentRecord] {
        &self.session.moments
    }

    /// Active (unpaused) time in seconds
    pub fn active_seconds(&self) -> f64 {
        self.active_seconds
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    pub fn session(&self) -> &WorkoutSession {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(37.7749, -122.4194).is_valid());
        assert!(Coordinate::new(-90.0, 180.0).is_valid());
        assert!(!Coordinate::new(90.5, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.1).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_workout_type_classification() {
        for ty in WorkoutType::ALL {
            assert_ne!(ty.uses_gps(), ty.is_exercise_based());
        }
        assert!(WorkoutType::Running.uses_gps());
        assert!(WorkoutType::Yoga.is_exercise_based());
        assert_eq!(WorkoutType::parse("HIIT"), Some(WorkoutType::Hiit));
        assert_eq!(WorkoutType::parse("rowing"), None);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&SessionStatus::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
    }
}
