//! Workout session lifecycle controller.
//!
//! Owns the current [`WorkoutSession`] and drives it through
//! Idle → Active ⇄ Paused → (Completed) → Idle. Two periodic sources feed it:
//! the one-second [`SessionTimer`] that refreshes active elapsed time, and the
//! [`PositionStream`] cadence that produces position samples. Neither runs on
//! its own thread; the owner calls [`SessionController::poll`] and every tick
//! that came due is applied in chronological order.
//!
//! Rejected operations return an error and leave the controller untouched.

use crate::clock::{Clock, SystemClock};
use crate::events::{Notifier, SessionEvent};
use crate::geo::haversine_distance;
use crate::media::MediaStore;
use crate::report::SessionReporter;
use crate::stream::PositionStream;
use crate::summary::Pace;
use crate::timer::{SessionTimer, Tick};
use crate::{
    CompletedSession, Config, Coordinate, Error, MediaKind, MediaRef, MomentRecord,
    PositionSample, Result, SessionStatus, WorkoutSession, WorkoutType,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::mpsc::Receiver;
use uuid::Uuid;

pub struct SessionController<C: Clock = SystemClock> {
    clock: C,
    status: SessionStatus,
    current: Option<WorkoutSession>,
    last_completed: Option<CompletedSession>,
    stream: PositionStream,
    timer: SessionTimer,
    paused_at: Option<DateTime<Utc>>,
    paused_total: Duration,
    elapsed: Duration,
    distance_meters: f64,
    events: Notifier<SessionEvent>,
}

impl<C: Clock> SessionController<C> {
    /// Controller with the standard one-second clock
    pub fn new(clock: C, stream: PositionStream) -> Result<Self> {
        Self::with_tick_period(clock, stream, std::time::Duration::from_secs(1))
    }

    /// Fails with [`Error::TimerUnavailable`] if the tick cannot be created.
    pub fn with_tick_period(
        clock: C,
        stream: PositionStream,
        tick_period: std::time::Duration,
    ) -> Result<Self> {
        let timer = SessionTimer::new(tick_period)?;
        Ok(Self {
            clock,
            status: SessionStatus::Idle,
            current: None,
            last_completed: None,
            stream,
            timer,
            paused_at: None,
            paused_total: Duration::zero(),
            elapsed: Duration::zero(),
            distance_meters: 0.0,
            events: Notifier::default(),
        })
    }

    /// Build the stream and timer from configuration
    pub fn from_config(clock: C, route: Vec<Coordinate>, config: &Config) -> Result<Self> {
        let mut stream = PositionStream::with_options(
            route,
            config.stream.base_interval(),
            config.stream.path_end,
        )?;
        stream.set_speed(config.stream.speed, clock.now())?;
        Self::with_tick_period(clock, stream, config.timer.tick_period())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub fn start(&mut self) -> Result<()> {
        self.start_session(None)
    }

    pub fn start_with_type(&mut self, workout_type: WorkoutType) -> Result<()> {
        self.start_session(Some(workout_type))
    }

    fn start_session(&mut self, workout_type: Option<WorkoutType>) -> Result<()> {
        if !matches!(self.status, SessionStatus::Idle | SessionStatus::Completed) {
            return Err(self.reject("start"));
        }

        let now = self.clock.now();
        self.stream.reset();
        self.current = Some(WorkoutSession::begin(now, workout_type));
        self.paused_at = None;
        self.paused_total = Duration::zero();
        self.elapsed = Duration::zero();
        self.distance_meters = 0.0;

        self.stream.start(now);
        if let Some(first) = self.stream.history().first().copied() {
            self.append_sample(first);
        }
        self.timer.start(now);
        self.set_status(SessionStatus::Active);

        tracing::info!(
            "Started session {} ({})",
            self.session_id().unwrap_or_default(),
            workout_type.map_or("untyped", |t| t.display_name())
        );
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.status != SessionStatus::Active {
            return Err(self.reject("pause"));
        }

        let now = self.clock.now();
        self.timer.stop();
        self.stream.pause();
        self.paused_at = Some(now);
        self.refresh_elapsed(now);
        self.set_status(SessionStatus::Paused);

        tracing::info!("Paused at {}s active", self.elapsed.num_seconds());
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.status != SessionStatus::Paused {
            return Err(self.reject("resume"));
        }

        let now = self.clock.now();
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total = self.paused_total + (now - paused_at);
        }
        self.timer.start(now);
        self.stream.resume(now);
        self.set_status(SessionStatus::Active);

        tracing::info!(
            "Resumed, {}s paused so far",
            self.paused_total.num_seconds()
        );
        Ok(())
    }

    /// Finish the session and return its sealed record.
    ///
    /// The controller is back to Idle afterwards; the record stays available
    /// through [`SessionController::last_completed`].
    pub fn end(&mut self) -> Result<&CompletedSession> {
        if !matches!(self.status, SessionStatus::Active | SessionStatus::Paused) {
            return Err(self.reject("end"));
        }
        let now = self.clock.now();
        self.timer.stop();
        self.stream.pause();
        self.refresh_elapsed(now);
        self.paused_at = None;

        let Some(mut session) = self.current.take() else {
            return Err(self.reject("end"));
        };

        session.end_time = Some(now);
        session.status = SessionStatus::Completed;
        self.set_status(SessionStatus::Completed);

        let id = session.id;
        let completed = CompletedSession::seal(session, self.elapsed, self.distance_meters);
        tracing::info!(
            "Ended session {}: {}s active, {:.0} m, {} moments",
            id,
            self.elapsed.num_seconds(),
            self.distance_meters,
            completed.moments().len()
        );
        self.events.emit(SessionEvent::SessionCompleted(id));
        self.set_status(SessionStatus::Idle);

        Ok(self.last_completed.insert(completed))
    }

    /// End the session and hand the record to `reporter`
    pub fn end_and_report(&mut self, reporter: &mut dyn SessionReporter) -> Result<()> {
        let completed = self.end()?;
        reporter.report(completed)
    }

    /// Start when idle, pause when active, resume when paused
    pub fn toggle(&mut self) -> Result<SessionStatus> {
        match self.status {
            SessionStatus::Idle | SessionStatus::Completed => self.start()?,
            SessionStatus::Active => self.pause()?,
            SessionStatus::Paused => self.resume()?,
        }
        Ok(self.status)
    }

    // ------------------------------------------------------------------
    // Moments and samples
    // ------------------------------------------------------------------

    /// Attach a moment at the latest recorded position. Only allowed while active.
    pub fn add_moment(&mut self, media: MediaRef) -> Result<MomentRecord> {
        if self.status != SessionStatus::Active {
            tracing::warn!("Rejected moment capture while {}", self.status);
            return Err(Error::InvalidCapture {
                status: self.status,
            });
        }
        let Some(session) = self.current.as_mut() else {
            return Err(Error::InvalidCapture {
                status: self.status,
            });
        };

        let coordinate = session
            .samples
            .last()
            .map_or_else(|| self.stream.current_coordinate(), |s| s.coordinate);
        let moment = MomentRecord {
            id: Uuid::new_v4(),
            timestamp: self.clock.now(),
            coordinate,
            media,
        };
        session.moments.push(moment.clone());

        tracing::debug!("Moment {} captured", moment.id);
        self.events.emit(SessionEvent::MomentAdded(moment.clone()));
        Ok(moment)
    }

    /// Persist a capture through `store`, then attach it as a moment.
    ///
    /// Nothing is persisted when the session is not active.
    pub fn capture_moment(
        &mut self,
        store: &mut dyn MediaStore,
        bytes: &[u8],
        kind: MediaKind,
    ) -> Result<MomentRecord> {
        if self.status != SessionStatus::Active {
            tracing::warn!("Rejected moment capture while {}", self.status);
            return Err(Error::InvalidCapture {
                status: self.status,
            });
        }
        let media = store.persist(bytes, kind)?;
        self.add_moment(media)
    }

    /// Feed a sample from an external position source.
    ///
    /// Returns false when the sample was dropped.
    pub fn ingest_sample(&mut self, sample: PositionSample) -> bool {
        if self.status != SessionStatus::Active {
            tracing::debug!("Dropping sample while {}", self.status);
            return false;
        }
        self.append_sample(sample)
    }

    fn append_sample(&mut self, sample: PositionSample) -> bool {
        let Some(session) = self.current.as_mut() else {
            return false;
        };
        if !sample.coordinate.is_valid() {
            tracing::warn!("Dropping malformed sample {:?}", sample.coordinate);
            return false;
        }

        if let Some(last) = session.samples.last() {
            if sample.timestamp < last.timestamp {
                tracing::warn!(
                    "Dropping out-of-order sample at {} (last {})",
                    sample.timestamp,
                    last.timestamp
                );
                return false;
            }
            self.distance_meters += haversine_distance(&last.coordinate, &sample.coordinate);
        }
        session.samples.push(sample);

        self.events.emit(SessionEvent::SampleAppended {
            sample,
            distance_meters: self.distance_meters,
        });
        true
    }

    // ------------------------------------------------------------------
    // Ticks
    // ------------------------------------------------------------------

    /// Apply every tick due by now, oldest first. Returns how many were applied.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now();
        let mut applied = 0;

        loop {
            let clock_due = self.timer.next_due().filter(|due| *due <= now);
            let stream_due = self.stream.next_due().filter(|due| *due <= now);

            let applied_tick = match (clock_due, stream_due) {
                (None, None) => break,
                (Some(c), Some(s)) if s < c => self.stream_tick(now),
                (Some(_), _) => self.clock_tick(now),
                (None, Some(_)) => self.stream_tick(now),
            };
            if applied_tick {
                applied += 1;
            }
        }
        applied
    }

    fn clock_tick(&mut self, now: DateTime<Utc>) -> bool {
        match self.timer.poll(now) {
            Some(tick) => self.on_clock_tick(tick),
            None => false,
        }
    }

    fn on_clock_tick(&mut self, tick: Tick) -> bool {
        if !self.timer.accepts(&tick) || self.status != SessionStatus::Active {
            tracing::debug!("Discarding stale clock tick due {}", tick.due);
            return false;
        }
        self.refresh_elapsed(tick.due);
        true
    }

    fn stream_tick(&mut self, now: DateTime<Utc>) -> bool {
        let Some(tick) = self.stream.next_tick(now) else {
            return false;
        };
        if self.status != SessionStatus::Active {
            tracing::debug!("Discarding cadence tick while {}", self.status);
            return false;
        }
        let Some(sample) = self.stream.apply(tick) else {
            return false;
        };
        if self.append_sample(sample) {
            return true;
        }
        tracing::warn!(
            "Cadence sample at {} refused, holding stream position",
            sample.timestamp
        );
        self.stream.retract();
        false
    }

    fn refresh_elapsed(&mut self, now: DateTime<Utc>) {
        let Some(session) = self.current.as_ref() else {
            return;
        };
        let until = self.paused_at.unwrap_or(now);
        self.elapsed = (until - session.start_time - self.paused_total).max(Duration::zero());
        self.events.emit(SessionEvent::ElapsedUpdated(self.elapsed));
    }

    fn set_status(&mut self, to: SessionStatus) {
        let from = std::mem::replace(&mut self.status, to);
        if let Some(session) = self.current.as_mut() {
            session.status = to;
        }
        self.events.emit(SessionEvent::StatusChanged { from, to });
    }

    fn reject(&self, action: &'static str) -> Error {
        tracing::warn!("Rejected {} while {}", action, self.status);
        Error::InvalidTransition {
            action,
            from: self.status,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Listen for every event.
    ///
    /// The channel is unbounded: a receiver kept alive but never drained
    /// accumulates one event per tick. Prefer [`Self::subscribe_bounded`] for
    /// listeners that may fall behind.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Listen with a backlog of at most `capacity` events; overflow is dropped
    pub fn subscribe_bounded(&mut self, capacity: usize) -> Receiver<SessionEvent> {
        self.events.subscribe_bounded(capacity)
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Active time as of the last tick or transition
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    pub fn pace(&self) -> Pace {
        Pace::compute(self.elapsed, self.distance_meters)
    }

    /// Moments of the current session
    pub fn moments(&self) -> &[MomentRecord] {
        self.current
            .as_ref()
            .map_or(&[], |session| session.moments.as_slice())
    }

    pub fn current_session(&self) -> Option<&WorkoutSession> {
        self.current.as_ref()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(|s| s.id)
    }

    pub fn last_completed(&self) -> Option<&CompletedSession> {
        self.last_completed.as_ref()
    }

    pub fn has_completed_session(&self) -> bool {
        self.last_completed.is_some()
    }

    pub fn stream(&self) -> &PositionStream {
        &self.stream
    }

    /// Change the simulated movement speed; returns the clamped value
    pub fn set_speed(&mut self, speed: f64) -> Result<f64> {
        let now = self.clock.now();
        self.stream.set_speed(speed, now)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::geo::path_length;
    use crate::media::InMemoryMediaStore;
    use crate::report::MemoryReporter;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T07:30:00Z")
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

    fn controller() -> (SessionController<ManualClock>, ManualClock) {
        crate::logging::init_test();
        let clock = ManualClock::new(t0());
        let stream = PositionStream::new(square()).unwrap();
        let controller = SessionController::new(clock.clone(), stream).unwrap();
        (controller, clock)
    }

    /// Advance one second at a time, polling after each step
    fn run_for(controller: &mut SessionController<ManualClock>, clock: &ManualClock, secs: i64) {
        for _ in 0..secs {
            clock.advance_secs(1);
            controller.poll();
        }
    }

    #[test]
    fn test_elapsed_excludes_paused_time() {
        let (mut c, clock) = controller();

        c.start().unwrap();
        run_for(&mut c, &clock, 120);
        assert_eq!(c.elapsed(), Duration::seconds(120));

        c.pause().unwrap();
        clock.advance_secs(30);
        assert_eq!(c.poll(), 0);
        assert_eq!(c.elapsed(), Duration::seconds(120));

        c.resume().unwrap();
        run_for(&mut c, &clock, 60);

        let completed = c.end().unwrap();
        assert_eq!(completed.active_seconds(), 180.0);
        assert_eq!(completed.status(), SessionStatus::Completed);
        assert_eq!(
            completed.end_time().unwrap() - completed.start_time(),
            Duration::seconds(210)
        );
        assert_eq!(c.status(), SessionStatus::Idle);
        assert_eq!(c.elapsed(), Duration::seconds(180));
    }

    #[test]
    fn test_end_while_paused_uses_pause_instant() {
        let (mut c, clock) = controller();
        c.start().unwrap();
        run_for(&mut c, &clock, 10);
        clock.advance_millis(400);
        c.pause().unwrap();
        clock.advance_secs(300);

        let completed = c.end().unwrap();
        assert_eq!(completed.active_seconds(), 10.4);
    }

    #[test]
    fn test_invalid_transitions_are_rejected_without_change() {
        let (mut c, _clock) = controller();

        let err = c.pause().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                action: "pause",
                from: SessionStatus::Idle
            }
        ));
        assert!(err.is_rejection());
        assert!(c.resume().is_err());
        assert!(c.end().is_err());
        assert_eq!(c.status(), SessionStatus::Idle);

        c.start().unwrap();
        assert!(c.start().is_err());
        assert!(c.resume().is_err());
        assert_eq!(c.status(), SessionStatus::Active);

        c.pause().unwrap();
        assert!(c.pause().is_err());
        assert_eq!(c.status(), SessionStatus::Paused);
    }

    #[test]
    fn test_distance_is_monotonic_and_matches_samples() {
        let (mut c, clock) = controller();
        c.start().unwrap();

        let mut last = 0.0;
        for _ in 0..20 {
            clock.advance_millis(500);
            c.poll();
            assert!(c.distance_meters() >= last);
            last = c.distance_meters();
        }

        let session = c.current_session().unwrap();
        assert_eq!(session.samples.len(), 21);
        let expected = path_length(session.samples.iter().map(|s| &s.coordinate));
        assert!((c.distance_meters() - expected).abs() < 1e-6);
        assert!(c.distance_meters() > 0.0);
    }

    #[test]
    fn test_samples_stop_while_paused() {
        let (mut c, clock) = controller();
        c.start().unwrap();
        run_for(&mut c, &clock, 2);
        c.pause().unwrap();
        let before = c.current_session().unwrap().samples.len();

        clock.advance_secs(60);
        c.poll();
        assert_eq!(c.current_session().unwrap().samples.len(), before);
    }

    #[test]
    fn test_moment_only_while_active() {
        let (mut c, clock) = controller();

        let err = c.add_moment(MediaRef::photo("idle.jpg")).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidCapture {
                status: SessionStatus::Idle
            }
        ));

        c.start().unwrap();
        clock.advance_millis(1000);
        c.poll();

        let moment = c.add_moment(MediaRef::photo("a.jpg")).unwrap();
        assert_eq!(moment.coordinate, c.stream().current_coordinate());
        assert_eq!(
            moment.coordinate,
            c.current_session().unwrap().samples.last().unwrap().coordinate
        );
        assert_eq!(moment.timestamp, clock.now());
        assert_eq!(c.moments().len(), 1);

        c.pause().unwrap();
        assert!(c.add_moment(MediaRef::photo("b.jpg")).is_err());
        assert_eq!(c.moments().len(), 1);
    }

    #[test]
    fn test_capture_moment_skips_store_when_rejected() {
        let (mut c, _clock) = controller();
        let mut store = InMemoryMediaStore::new();

        assert!(c.capture_moment(&mut store, b"img", MediaKind::Photo).is_err());
        assert!(store.is_empty());

        c.start().unwrap();
        let moment = c.capture_moment(&mut store, b"img", MediaKind::Photo).unwrap();
        assert_eq!(store.get(&moment.media), Some(&b"img"[..]));
    }

    #[test]
    fn test_immediate_end_has_undefined_pace() {
        let (mut c, _clock) = controller();
        c.start().unwrap();

        let completed = c.end().unwrap();
        assert_eq!(completed.distance_meters(), 0.0);
        assert_eq!(c.pace(), Pace::Undefined);
    }

    #[test]
    fn test_completed_snapshot_survives_new_session() {
        let (mut c, clock) = controller();
        let mut reporter = MemoryReporter::new();

        c.start_with_type(WorkoutType::Running).unwrap();
        run_for(&mut c, &clock, 3);
        c.add_moment(MediaRef::photo("view.jpg")).unwrap();
        c.end_and_report(&mut reporter).unwrap();

        let first = c.last_completed().unwrap().clone();
        assert_eq!(first.workout_type(), Some(WorkoutType::Running));
        assert_eq!(first.moments().len(), 1);
        assert!(c.has_completed_session());
        assert!(c.current_session().is_none());
        assert!(c.moments().is_empty());

        c.start().unwrap();
        run_for(&mut c, &clock, 5);
        assert_eq!(c.last_completed().unwrap().id(), first.id());
        assert_eq!(
            c.last_completed().unwrap().samples().len(),
            first.samples().len()
        );
        assert_eq!(reporter.sessions().len(), 1);
        assert_eq!(c.elapsed(), Duration::seconds(5));
    }

    #[test]
    fn test_ingest_drops_malformed_and_out_of_order() {
        let (mut c, clock) = controller();
        assert!(!c.ingest_sample(PositionSample::new(square()[1], t0())));

        c.start().unwrap();
        clock.advance_secs(1);

        let bad = PositionSample::new(Coordinate::new(f64::NAN, 10.0), clock.now());
        assert!(!c.ingest_sample(bad));
        let old = PositionSample::new(square()[1], t0() - Duration::seconds(5));
        assert!(!c.ingest_sample(old));
        assert_eq!(c.distance_meters(), 0.0);

        let good = PositionSample::new(square()[1], clock.now());
        assert!(c.ingest_sample(good));
        assert_eq!(c.current_session().unwrap().samples.len(), 2);
        assert!(c.distance_meters() > 100.0);
    }

    #[test]
    fn test_moment_uses_ingested_position() {
        let (mut c, clock) = controller();
        c.start().unwrap();
        clock.advance_millis(200);

        let external = Coordinate::new(40.0, -100.0);
        assert!(c.ingest_sample(PositionSample::new(external, clock.now())));

        let moment = c.add_moment(MediaRef::photo("here.jpg")).unwrap();
        assert_eq!(moment.coordinate, external);
    }

    #[test]
    fn test_refused_cadence_sample_holds_stream() {
        let (mut c, clock) = controller();
        c.start().unwrap();
        clock.advance_millis(200);

        let external = Coordinate::new(40.0, -100.0);
        let ahead = clock.now() + Duration::seconds(10);
        assert!(c.ingest_sample(PositionSample::new(external, ahead)));
        let recorded = c.current_session().unwrap().samples.len();

        run_for(&mut c, &clock, 3);
        assert_eq!(c.current_session().unwrap().samples.len(), recorded);
        assert_eq!(c.stream().index(), 0);
        assert_eq!(c.stream().history().len(), 1);

        let moment = c.add_moment(MediaRef::photo("ahead.jpg")).unwrap();
        assert_eq!(moment.coordinate, external);
        let samples = &c.current_session().unwrap().samples;
        assert!(samples.iter().any(|s| s.coordinate == moment.coordinate));
    }

    #[test]
    fn test_toggle_cycles_states() {
        let (mut c, _clock) = controller();
        assert_eq!(c.toggle().unwrap(), SessionStatus::Active);
        assert_eq!(c.toggle().unwrap(), SessionStatus::Paused);
        assert_eq!(c.toggle().unwrap(), SessionStatus::Active);
    }

    #[test]
    fn test_events_follow_transitions() {
        let (mut c, clock) = controller();
        let rx = c.subscribe();

        c.start().unwrap();
        clock.advance_secs(1);
        c.poll();
        c.end().unwrap();

        let statuses: Vec<_> = rx
            .try_iter()
            .filter_map(|e| match e {
                SessionEvent::StatusChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                SessionStatus::Active,
                SessionStatus::Completed,
                SessionStatus::Idle
            ]
        );
    }

    #[test]
    fn test_bounded_subscriber_keeps_only_backlog() {
        let (mut c, clock) = controller();
        let rx = c.subscribe_bounded(4);

        c.start().unwrap();
        run_for(&mut c, &clock, 60);

        assert_eq!(rx.try_iter().count(), 4);
        assert_eq!(c.elapsed(), Duration::seconds(60));
    }

    #[test]
    fn test_zero_tick_period_fails_construction() {
        let clock = ManualClock::new(t0());
        let stream = PositionStream::new(square()).unwrap();
        let result = SessionController::with_tick_period(clock, stream, std::time::Duration::ZERO);
        assert!(matches!(result, Err(Error::TimerUnavailable(_))));
    }
}
