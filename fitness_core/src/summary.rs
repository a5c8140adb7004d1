//! Derived session figures and their display formats.

use crate::CompletedSession;
use chrono::Duration;
use serde::Serialize;
use std::fmt;

/// Average pace in minutes per kilometer
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    /// No distance (or no time) covered yet
    Undefined,
    MinutesPerKm(f64),
}

impl Pace {
    pub fn compute(elapsed: Duration, distance_meters: f64) -> Self {
        let minutes = elapsed.num_milliseconds() as f64 / 60_000.0;
        if distance_meters <= 0.0 || minutes <= 0.0 || !distance_meters.is_finite() {
            return Pace::Undefined;
        }
        Pace::MinutesPerKm(minutes / (distance_meters / 1000.0))
    }

    pub fn minutes_per_km(&self) -> Option<f64> {
        match self {
            Pace::Undefined => None,
            Pace::MinutesPerKm(p) => Some(*p),
        }
    }
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pace::Undefined => write!(f, "--:-- /km"),
            Pace::MinutesPerKm(pace) => {
                let minutes = pace.trunc() as i64;
                let seconds = ((pace - pace.trunc()) * 60.0) as i64;
                write!(f, "{}:{:02} /km", minutes, seconds)
            }
        }
    }
}

/// `MM:SS`, minutes are not wrapped into hours
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.num_seconds().max(0);
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Meters below one kilometer, kilometers with two decimals above
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{:.0} m", meters)
    }
}

/// Recap figures for a finished session
#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub active_seconds: f64,
    pub distance_meters: f64,
    pub pace: Pace,
    pub sample_count: usize,
    pub moment_count: usize,
}

impl SessionSummary {
    pub fn of(session: &CompletedSession) -> Self {
        let active = Duration::milliseconds((session.active_seconds() * 1000.0).round() as i64);
        Self {
            active_seconds: session.active_seconds(),
            distance_meters: session.distance_meters(),
            pace: Pace::compute(active, session.distance_meters()),
            sample_count: session.samples().len(),
            moment_count: session.moments().len(),
        }
    }

    pub fn formatted_duration(&self) -> String {
        format_elapsed(Duration::milliseconds((self.active_seconds * 1000.0) as i64))
    }

    pub fn formatted_distance(&self) -> String {
        format_distance(self.distance_meters)
    }
}
