//! Simulated position stream along a fixed closed path.
//!
//! The stream walks the waypoints of its path one per cadence tick,
//! recording every visited waypoint as a [`PositionSample`]. Cadence is the
//! base interval divided by the speed multiplier.

use crate::timer::{SessionTimer, Tick};
use crate::{Coordinate, Error, PositionSample, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_SPEED: f64 = 0.5;
pub const MAX_SPEED: f64 = 3.0;
pub const DEFAULT_BASE_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);

/// What happens on the tick after the final waypoint
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PathEnd {
    /// Go back to the first waypoint and keep walking; history is kept
    #[default]
    Loop,
    /// Stop ticking at the final waypoint
    Stop,
}

#[derive(Clone, Debug)]
pub struct PositionStream {
    path: Vec<Coordinate>,
    index: usize,
    history: Vec<PositionSample>,
    base_interval: std::time::Duration,
    speed: f64,
    path_end: PathEnd,
    timer: SessionTimer,
}

impl PositionStream {
    /// Stream over `path` with the default cadence and loop behaviour
    pub fn new(path: Vec<Coordinate>) -> Result<Self> {
        Self::with_options(path, DEFAULT_BASE_INTERVAL, PathEnd::Loop)
    }

    /// Invalid waypoints are dropped; a path left empty is an error.
    pub fn with_options(
        path: Vec<Coordinate>,
        base_interval: std::time::Duration,
        path_end: PathEnd,
    ) -> Result<Self> {
        let total = path.len();
        let path: Vec<Coordinate> = path.into_iter().filter(Coordinate::is_valid).collect();
        if path.len() < total {
            tracing::warn!(
                "Dropped {} malformed waypoint(s) from route",
                total - path.len()
            );
        }
        if path.is_empty() {
            return Err(Error::Route("route has no valid waypoints".into()));
        }

        // Slowest cadence must still be a usable timer period
        SessionTimer::new(base_interval.div_f64(MIN_SPEED))?;
        let timer = SessionTimer::new(base_interval)?;

        Ok(Self {
            path,
            index: 0,
            history: Vec::new(),
            base_interval,
            speed: 1.0,
            path_end,
            timer,
        })
    }

    /// Interval between samples at the current speed
    pub fn cadence(&self) -> std::time::Duration {
        self.base_interval.div_f64(self.speed)
    }

    /// Restart from the first waypoint with an empty history and begin ticking
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.index = 0;
        self.history.clear();
        self.history.push(PositionSample::new(self.path[0], now));
        self.timer.start(now);
        tracing::debug!("Position stream started, cadence {:?}", self.cadence());
    }

    /// Stop ticking; the waypoint index is kept
    pub fn pause(&mut self) {
        self.timer.stop();
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        if !self.timer.is_running() {
            self.timer.start(now);
        }
    }

    /// Stop ticking and return to the first waypoint with no history
    pub fn reset(&mut self) {
        self.timer.stop();
        self.index = 0;
        self.history.clear();
    }

    /// Set the speed multiplier, clamped to [`MIN_SPEED`, `MAX_SPEED`].
    ///
    /// Returns the speed actually applied.
    pub fn set_speed(&mut self, speed: f64, now: DateTime<Utc>) -> Result<f64> {
        if !speed.is_finite() {
            tracing::warn!("Ignoring non-finite speed {}", speed);
            return Ok(self.speed);
        }
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.timer.set_period(self.cadence(), now)?;
        Ok(self.speed)
    }

    /// Next cadence tick due at or before `now`
    pub fn next_tick(&mut self, now: DateTime<Utc>) -> Option<Tick> {
        self.timer.poll(now)
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.timer.next_due()
    }

    /// Move to the next waypoint for `tick`.
    ///
    /// Returns the appended sample, or `None` when the tick is stale or the
    /// stream stopped at the end of the path.
    pub fn apply(&mut self, tick: Tick) -> Option<PositionSample> {
        if !self.timer.accepts(&tick) {
            tracing::debug!("Discarding stale cadence tick due {}", tick.due);
            return None;
        }

        if self.index + 1 < self.path.len() {
            self.index += 1;
        } else {
            match self.path_end {
                PathEnd::Loop => {
                    tracing::debug!("Route end reached, looping to first waypoint");
                    self.index = 0;
                }
                PathEnd::Stop => {
                    tracing::debug!("Route end reached, stopping stream");
                    self.timer.stop();
                    return None;
                }
            }
        }

        let sample = PositionSample::new(self.path[self.index], tick.due);
        self.history.push(sample);
        Some(sample)
    }

    /// Undo the last cadence step after its sample was refused downstream.
    ///
    /// The stream steps back to the previous waypoint so its position stays
    /// in line with what was recorded.
    pub fn retract(&mut self) {
        if self.history.len() < 2 {
            return;
        }
        self.history.pop();
        self.index = if self.index == 0 {
            self.path.len() - 1
        } else {
            self.index - 1
        };
    }

    /// Apply every tick due by `now`, returning the samples appended
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<PositionSample> {
        let mut appended = Vec::new();
        while let Some(tick) = self.next_tick(now) {
            appended.extend(self.apply(tick));
        }
        appended
    }

    pub fn current_coordinate(&self) -> Coordinate {
        self.path[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn history(&self) -> &[PositionSample] {
        &self.history
    }

    pub fn path(&self) -> &[Coordinate] {
        &self.path
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_running()
    }

    /// Fraction of the path covered in the current lap
    pub fn progress(&self) -> f64 {
        if self.path.len() < 2 {
            return 0.0;
        }
        self.index as f64 / (self.path.len() - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn square() -> Vec<Coordinate> {
        vec![
            Coordinate::new(37.7749, -122.4194),
            Coordinate::new(37.7759, -122.4194),
            Coordinate::new(37.7759, -122.4184),
            Coordinate::new(37.7749, -122.4184),
        ]
    }

    #[test]
    fn test_full_traversal_then_wrap() {
        let mut stream = PositionStream::new(square()).unwrap();
        stream.start(t0());

        let appended = stream.poll(t0() + Duration::milliseconds(1500));
        assert_eq!(appended.len(), 3);
        assert_eq!(stream.history().len(), 4);
        assert_eq!(stream.progress(), 1.0);

        let wrapped = stream.poll(t0() + Duration::milliseconds(2000));
        assert_eq!(wrapped.len(), 1);
        assert_eq!(stream.index(), 0);
        assert_eq!(stream.current_coordinate(), square()[0]);
        assert_eq!(stream.history().len(), 5);
        assert_eq!(stream.progress(), 0.0);
    }

    #[test]
    fn test_stop_at_end() {
        let mut stream =
            PositionStream::with_options(square(), DEFAULT_BASE_INTERVAL, PathEnd::Stop).unwrap();
        stream.start(t0());

        stream.poll(t0() + Duration::seconds(10));
        assert_eq!(stream.history().len(), 4);
        assert_eq!(stream.index(), 3);
        assert!(!stream.is_active());
    }

    #[test]
    fn test_sample_timestamps_follow_cadence() {
        let mut stream = PositionStream::new(square()).unwrap();
        stream.start(t0());
        stream.poll(t0() + Duration::seconds(1));

        let stamps: Vec<_> = stream.history().iter().map(|s| s.timestamp).collect();
        assert_eq!(
            stamps,
            vec![
                t0(),
                t0() + Duration::milliseconds(500),
                t0() + Duration::milliseconds(1000)
            ]
        );
    }

    #[test]
    fn test_pause_keeps_index() {
        let mut stream = PositionStream::new(square()).unwrap();
        stream.start(t0());
        stream.poll(t0() + Duration::milliseconds(500));
        stream.pause();

        assert!(stream.poll(t0() + Duration::seconds(30)).is_empty());
        assert_eq!(stream.index(), 1);

        stream.resume(t0() + Duration::seconds(30));
        stream.poll(t0() + Duration::milliseconds(30_500));
        assert_eq!(stream.index(), 2);
        assert_eq!(stream.history().len(), 3);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut stream = PositionStream::new(square()).unwrap();
        stream.start(t0());
        stream.poll(t0() + Duration::seconds(1));
        stream.reset();

        assert!(stream.history().is_empty());
        assert_eq!(stream.index(), 0);
        assert!(!stream.is_active());
    }

    #[test]
    fn test_speed_is_clamped_and_changes_cadence() {
        let mut stream = PositionStream::new(square()).unwrap();
        assert_eq!(stream.set_speed(10.0, t0()).unwrap(), MAX_SPEED);
        assert_eq!(stream.set_speed(0.1, t0()).unwrap(), MIN_SPEED);
        assert_eq!(stream.cadence(), std::time::Duration::from_secs(1));

        stream.set_speed(2.0, t0()).unwrap();
        stream.start(t0());
        stream.poll(t0() + Duration::milliseconds(750));
        assert_eq!(stream.history().len(), 4);
    }

    #[test]
    fn test_malformed_waypoints_dropped() {
        let mut path = square();
        path.insert(1, Coordinate::new(f64::NAN, 0.0));
        path.push(Coordinate::new(120.0, 0.0));

        let stream = PositionStream::new(path).unwrap();
        assert_eq!(stream.path(), square().as_slice());

        let err = PositionStream::new(vec![Coordinate::new(f64::NAN, 0.0)]).unwrap_err();
        assert!(matches!(err, Error::Route(_)));
    }

    #[test]
    fn test_retract_steps_back_across_wrap() {
        let mut stream = PositionStream::new(square()).unwrap();
        stream.start(t0());
        stream.poll(t0() + Duration::seconds(2));
        assert_eq!(stream.index(), 0);
        assert_eq!(stream.history().len(), 5);

        stream.retract();
        assert_eq!(stream.index(), 3);
        assert_eq!(stream.history().len(), 4);

        // The starting sample is never retracted
        let mut fresh = PositionStream::new(square()).unwrap();
        fresh.start(t0());
        fresh.retract();
        assert_eq!(fresh.history().len(), 1);
        assert_eq!(fresh.index(), 0);
    }

    #[test]
    fn test_stale_tick_discarded_after_pause() {
        let mut stream = PositionStream::new(square()).unwrap();
        stream.start(t0());
        let tick = stream.next_tick(t0() + Duration::milliseconds(500)).unwrap();
        stream.pause();

        assert!(stream.apply(tick).is_none());
        assert_eq!(stream.history().len(), 1);
    }
}
