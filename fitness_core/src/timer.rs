//! Cancellable periodic tick.
//!
//! A [`SessionTimer`] does not own a thread. The owner polls it with the
//! current instant and gets back every tick that has come due. Each tick
//! carries the timer generation it was produced under; `stop` and `start`
//! bump the generation, so a tick fetched before a stop is rejected by
//! [`SessionTimer::accepts`] and never applied.

use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};

/// Longest supported period
const MAX_PERIOD: std::time::Duration = std::time::Duration::from_secs(3600);

/// One due tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
    pub due: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct SessionTimer {
    period: Duration,
    next_due: Option<DateTime<Utc>>,
    generation: u64,
}

impl SessionTimer {
    /// Create a stopped timer with the given period.
    ///
    /// Fails with [`Error::TimerUnavailable`] for a zero or oversized period.
    pub fn new(period: std::time::Duration) -> Result<Self> {
        let period = Self::checked_period(period)?;
        Ok(Self {
            period,
            next_due: None,
            generation: 0,
        })
    }

    /// The one-second clock used for elapsed time and rest countdowns
    pub fn every_second() -> Result<Self> {
        Self::new(std::time::Duration::from_secs(1))
    }

    fn checked_period(period: std::time::Duration) -> Result<Duration> {
        if period.is_zero() || period > MAX_PERIOD {
            return Err(Error::TimerUnavailable(format!(
                "unsupported tick period {:?}",
                period
            )));
        }
        Duration::from_std(period)
            .map_err(|e| Error::TimerUnavailable(format!("tick period out of range: {}", e)))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.next_due
    }

    /// (Re)start ticking; the first tick is due one period after `now`
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.generation += 1;
        self.next_due = Some(now + self.period);
    }

    /// Stop ticking. Calling it on a stopped timer does nothing.
    pub fn stop(&mut self) {
        if self.next_due.take().is_some() {
            self.generation += 1;
        }
    }

    /// Change the period, restarting from `now` if the timer is running
    pub fn set_period(&mut self, period: std::time::Duration, now: DateTime<Utc>) -> Result<()> {
        self.period = Self::checked_period(period)?;
        if self.is_running() {
            self.start(now);
        }
        Ok(())
    }

    /// Take the next tick due at or before `now`, if any
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<Tick> {
        let due = self.next_due?;
        if due > now {
            return None;
        }
        self.next_due = Some(due + self.period);
        Some(Tick {
            generation: self.generation,
            due,
        })
    }

    /// Whether a previously polled tick may still be applied
    pub fn accepts(&self, tick: &Tick) -> bool {
        self.is_running() && tick.generation == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_zero_period_is_unavailable() {
        let err = SessionTimer::new(std::time::Duration::ZERO).unwrap_err();
        assert!(matches!(err, Error::TimerUnavailable(_)));
    }

    #[test]
    fn test_ticks_come_due_once_per_period() {
        let mut timer = SessionTimer::every_second().unwrap();
        timer.start(t0());

        assert!(timer.poll(t0()).is_none());

        let now = t0() + Duration::milliseconds(3500);
        let mut ticks = Vec::new();
        while let Some(tick) = timer.poll(now) {
            ticks.push(tick);
        }
        assert_eq!(ticks.len(), 3);
        assert_eq!(ticks[2].due, t0() + Duration::seconds(3));
        assert!(ticks.iter().all(|t| timer.accepts(t)));
    }

    #[test]
    fn test_stopped_timer_never_fires() {
        let mut timer = SessionTimer::every_second().unwrap();
        timer.start(t0());
        timer.stop();
        timer.stop();

        assert!(!timer.is_running());
        assert!(timer.poll(t0() + Duration::seconds(10)).is_none());
    }

    #[test]
    fn test_tick_racing_stop_is_rejected() {
        let mut timer = SessionTimer::every_second().unwrap();
        timer.start(t0());
        let tick = timer.poll(t0() + Duration::seconds(1)).unwrap();

        timer.stop();
        assert!(!timer.accepts(&tick));

        // A restart does not revive the old tick either
        timer.start(t0() + Duration::seconds(2));
        assert!(!timer.accepts(&tick));
    }

    #[test]
    fn test_set_period_restarts_running_timer() {
        let mut timer = SessionTimer::new(std::time::Duration::from_millis(500)).unwrap();
        timer.start(t0());
        timer
            .set_period(std::time::Duration::from_millis(250), t0())
            .unwrap();
        assert_eq!(timer.next_due(), Some(t0() + Duration::milliseconds(250)));

        timer.stop();
        timer
            .set_period(std::time::Duration::from_secs(1), t0())
            .unwrap();
        assert!(!timer.is_running());
    }
}
