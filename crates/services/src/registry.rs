//! Concurrency-safe map of live tracking sessions.
//!
//! The registry-wide lock is only held to insert, remove, or look up an entry.
//! Each session sits behind its own mutex, held across the dwell latch and the
//! sequencer for one signal, so concurrent reporters advance a step at most
//! once per dwell.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use sop_core::model::{SessionId, Step, StepEvent, Zone, ZoneId, ZoneSignal};
use sop_core::{
    AdherenceReport, Clock, EnterOutcome, IgnoreReason, Session, SessionError, SessionStatus,
    SignalOutcome,
};

type SessionHandle = Arc<Mutex<Session>>;

//
// ─── SNAPSHOTS ─────────────────────────────────────────────────────────────────
//

/// The step a display should prompt for next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextStep {
    pub position: u32,
    pub name: String,
    pub zone_id: ZoneId,
    pub zone_name: String,
    pub target_duration_secs: u32,
}

/// Point-in-time view of one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub current_step: usize,
    pub total_steps: usize,
    pub step_events: Vec<StepEvent>,
    pub elapsed_secs: f64,
    pub next_step: Option<NextStep>,
    pub created_at: DateTime<Utc>,
}

/// Row of the active-session listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionListing {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub current_step: usize,
    pub total_steps: usize,
    pub created_at: DateTime<Utc>,
}

fn snapshot(id: SessionId, session: &Session, now: DateTime<Utc>) -> SessionSnapshot {
    let sequencer = session.sequencer();
    SessionSnapshot {
        session_id: id,
        status: sequencer.status(),
        current_step: sequencer.current_step(),
        total_steps: sequencer.total_steps(),
        step_events: sequencer.events().to_vec(),
        elapsed_secs: sequencer.elapsed_secs(now),
        next_step: sequencer.next_step().map(|(step, zone_name)| NextStep {
            position: step.position(),
            name: step.name().to_string(),
            zone_id: step.target_zone(),
            zone_name: zone_name.to_string(),
            target_duration_secs: step.target_duration_secs(),
        }),
        created_at: session.created_at(),
    }
}

//
// ─── REGISTRY ──────────────────────────────────────────────────────────────────
//

/// Live sessions keyed by id. Shared between API callers and detector loops
/// through an `Arc`.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    clock: Clock,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    fn handle(&self, id: SessionId) -> Result<SessionHandle, SessionError> {
        let handle = self.sessions.read().get(&id).cloned();
        handle.ok_or_else(|| {
            tracing::warn!(session_id = %id, "unknown session");
            SessionError::UnknownSession(id)
        })
    }

    /// Creates a `Ready` session from a snapshot of steps and zones.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidZoneGeometry` or
    /// `SessionError::UnknownTargetZone` if the snapshot is inconsistent.
    pub fn create(&self, steps: Vec<Step>, zones: Vec<Zone>) -> Result<SessionId, SessionError> {
        let total_steps = steps.len();
        let zone_count = zones.len();
        let session = Session::new(steps, zones, self.clock.now())?;
        let id = SessionId::generate();

        self.sessions
            .write()
            .insert(id, Arc::new(Mutex::new(session)));

        tracing::info!(
            session_id = %id,
            total_steps,
            zones = zone_count,
            "session created"
        );
        Ok(id)
    }

    /// Starts tracking using the registry clock.
    ///
    /// # Errors
    ///
    /// See [`SessionRegistry::start_at`].
    pub fn start(&self, id: SessionId) -> Result<(), SessionError> {
        self.start_at(id, self.clock.now())
    }

    /// Starts tracking with an explicit start time.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownSession`, `SessionError::NoSteps`, or
    /// `SessionError::Finished` for a terminal session.
    pub fn start_at(&self, id: SessionId, now: DateTime<Utc>) -> Result<(), SessionError> {
        let handle = self.handle(id)?;
        let mut session = handle.lock();
        let was = session.status();
        session.start(now)?;
        if was == SessionStatus::Ready {
            tracing::info!(session_id = %id, started_at = %now, "session started");
        }
        Ok(())
    }

    /// Feeds one containment signal through the session's dwell latch and sequencer.
    ///
    /// Wrong zones, repeated enters, and signals outside `Tracking` are not
    /// errors; they come back as `SignalOutcome` variants.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownSession` if `id` is not registered.
    pub fn signal(
        &self,
        id: SessionId,
        signal: &ZoneSignal,
    ) -> Result<SignalOutcome, SessionError> {
        let handle = self.handle(id)?;
        let outcome = handle.lock().apply(signal);
        log_outcome(id, signal, &outcome);
        Ok(outcome)
    }

    /// Stops using the registry clock.
    ///
    /// # Errors
    ///
    /// See [`SessionRegistry::stop_at`].
    pub fn stop(&self, id: SessionId) -> Result<AdherenceReport, SessionError> {
        self.stop_at(id, self.clock.now())
    }

    /// Finalizes the session and returns its adherence report. Repeat calls
    /// return the same report.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownSession`, or `SessionError::NotTracking`
    /// if the session was never started.
    pub fn stop_at(
        &self,
        id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<AdherenceReport, SessionError> {
        let handle = self.handle(id)?;
        let mut session = handle.lock();
        let first_stop = !session.sequencer().is_finalized();
        let report = session.stop(now)?;
        if first_stop {
            tracing::info!(
                session_id = %id,
                status = %session.status(),
                completed_steps = report.completed_steps,
                total_steps = report.total_steps,
                overall = report.overall_adherence,
                "session stopped"
            );
        }
        Ok(report)
    }

    /// # Errors
    ///
    /// Returns `SessionError::UnknownSession` if `id` is not registered.
    pub fn status(&self, id: SessionId) -> Result<SessionSnapshot, SessionError> {
        self.status_at(id, self.clock.now())
    }

    /// # Errors
    ///
    /// Returns `SessionError::UnknownSession` if `id` is not registered.
    pub fn status_at(
        &self,
        id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<SessionSnapshot, SessionError> {
        let handle = self.handle(id)?;
        let session = handle.lock();
        Ok(snapshot(id, &session, now))
    }

    /// Drops a session. Removing an unknown id is a no-op; returns whether
    /// anything was removed.
    pub fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().remove(&id).is_some();
        if removed {
            tracing::info!(session_id = %id, "session removed");
        }
        removed
    }

    /// All registered sessions, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<SessionListing> {
        let handles: Vec<(SessionId, SessionHandle)> = self
            .sessions
            .read()
            .iter()
            .map(|(id, handle)| (*id, Arc::clone(handle)))
            .collect();

        let mut listing: Vec<SessionListing> = handles
            .into_iter()
            .map(|(id, handle)| {
                let session = handle.lock();
                SessionListing {
                    session_id: id,
                    status: session.status(),
                    current_step: session.sequencer().current_step(),
                    total_steps: session.sequencer().total_steps(),
                    created_at: session.created_at(),
                }
            })
            .collect();
        listing.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        listing
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

fn log_outcome(id: SessionId, signal: &ZoneSignal, outcome: &SignalOutcome) {
    match outcome {
        SignalOutcome::Entered { zone, outcome } => match outcome {
            EnterOutcome::StepCompleted(event) => tracing::info!(
                session_id = %id,
                step = event.step_index,
                step_name = %event.step_name,
                zone = %zone,
                elapsed_secs = event.elapsed_secs,
                "step completed"
            ),
            EnterOutcome::ProcessCompleted(event) => tracing::info!(
                session_id = %id,
                step = event.step_index,
                step_name = %event.step_name,
                zone = %zone,
                elapsed_secs = event.elapsed_secs,
                "process completed"
            ),
            EnterOutcome::WrongZone { expected, got } => tracing::debug!(
                session_id = %id,
                expected = %expected,
                got = %got,
                "entered wrong zone"
            ),
            EnterOutcome::AlreadyComplete | EnterOutcome::NotTracking(_) => tracing::debug!(
                session_id = %id,
                zone = %zone,
                "enter ignored"
            ),
        },
        SignalOutcome::Exited { zone, dwell } => tracing::trace!(
            session_id = %id,
            zone = %zone,
            dwell_ms = dwell.num_milliseconds(),
            "zone exited"
        ),
        SignalOutcome::Ignored(IgnoreReason::UnknownZone(zone)) => tracing::debug!(
            session_id = %id,
            zone = %zone,
            "signal for unknown zone dropped"
        ),
        SignalOutcome::Ignored(IgnoreReason::NotTracking(status)) => tracing::trace!(
            session_id = %id,
            status = %status,
            zone = %signal.zone_id,
            "signal outside tracking dropped"
        ),
        SignalOutcome::Unchanged => {}
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use sop_core::model::{Rect, Rgb};
    use sop_core::time::{fixed_at, fixed_clock, fixed_now};

    fn zone(id: u64) -> Zone {
        Zone::new(
            ZoneId::new(id),
            format!("Zone {id}"),
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rgb::default(),
        )
        .unwrap()
    }

    fn step(pos: u32, zone: u64, secs: u32) -> Step {
        Step::new(pos, format!("Step {pos}"), ZoneId::new(zone), secs, None).unwrap()
    }

    fn registry_with_two_steps() -> (SessionRegistry, SessionId) {
        let registry = SessionRegistry::new(fixed_clock());
        let id = registry
            .create(vec![step(1, 1, 5), step(2, 2, 5)], vec![zone(1), zone(2)])
            .unwrap();
        (registry, id)
    }

    fn enter(zone: u64, secs: f64) -> ZoneSignal {
        ZoneSignal::new(ZoneId::new(zone), true, 0.9, fixed_at(secs))
    }

    fn leave(zone: u64, secs: f64) -> ZoneSignal {
        ZoneSignal::new(ZoneId::new(zone), false, 0.9, fixed_at(secs))
    }

    #[test]
    fn unknown_session_is_reported() {
        let registry = SessionRegistry::new(fixed_clock());
        let id = SessionId::generate();
        assert_eq!(registry.start(id), Err(SessionError::UnknownSession(id)));
        assert_eq!(
            registry.signal(id, &enter(1, 0.0)),
            Err(SessionError::UnknownSession(id))
        );
        assert!(matches!(
            registry.status(id),
            Err(SessionError::UnknownSession(_))
        ));
    }

    #[test]
    fn degenerate_zone_is_rejected_at_create() {
        let registry = SessionRegistry::new(fixed_clock());
        let bad = Zone::new(
            ZoneId::new(1),
            "Bad",
            Rect::new(10.0, 0.0, 0.0, 10.0),
            Rgb::default(),
        )
        .unwrap();
        let err = registry.create(vec![step(1, 1, 5)], vec![bad]).unwrap_err();
        assert_eq!(err, SessionError::InvalidZoneGeometry { zone: ZoneId::new(1) });
        assert!(registry.is_empty());
    }

    #[test]
    fn empty_session_cannot_start() {
        let registry = SessionRegistry::new(fixed_clock());
        let id = registry.create(Vec::new(), vec![zone(1)]).unwrap();
        assert_eq!(registry.start(id), Err(SessionError::NoSteps));
        assert_eq!(registry.status(id).unwrap().status, SessionStatus::Ready);
    }

    #[test]
    fn stop_before_start_is_not_tracking() {
        let (registry, id) = registry_with_two_steps();
        assert_eq!(registry.stop(id), Err(SessionError::NotTracking));
    }

    #[test]
    fn signals_before_start_leave_latch_untouched() {
        let (registry, id) = registry_with_two_steps();
        let outcome = registry.signal(id, &enter(1, 0.0)).unwrap();
        assert_eq!(
            outcome,
            SignalOutcome::Ignored(IgnoreReason::NotTracking(SessionStatus::Ready))
        );

        registry.start_at(id, fixed_now()).unwrap();
        let outcome = registry.signal(id, &enter(1, 1.0)).unwrap();
        assert!(outcome.completed_step().is_some());
    }

    #[test]
    fn snapshot_reports_progress_and_next_step() {
        let (registry, id) = registry_with_two_steps();
        let ready = registry.status(id).unwrap();
        assert_eq!(ready.elapsed_secs, 0.0);
        assert_eq!(ready.total_steps, 2);
        assert_eq!(ready.next_step.as_ref().map(|s| s.position), Some(1));

        registry.start_at(id, fixed_now()).unwrap();
        registry.signal(id, &enter(1, 3.0)).unwrap();

        let snap = registry.status_at(id, fixed_at(4.0)).unwrap();
        assert_eq!(snap.status, SessionStatus::Tracking);
        assert_eq!(snap.current_step, 1);
        assert_eq!(snap.step_events.len(), 1);
        assert_eq!(snap.elapsed_secs, 4.0);
        let next = snap.next_step.unwrap();
        assert_eq!(next.zone_id, ZoneId::new(2));
        assert_eq!(next.zone_name, "Zone 2");
    }

    #[test]
    fn stop_is_idempotent_and_freezes_elapsed() {
        let (registry, id) = registry_with_two_steps();
        registry.start_at(id, fixed_now()).unwrap();
        registry.signal(id, &enter(1, 2.0)).unwrap();

        let first = registry.stop_at(id, fixed_at(8.0)).unwrap();
        let second = registry.stop_at(id, fixed_at(20.0)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.completed_steps, 1);
        assert_eq!(first.total_time_secs, 8.0);

        let snap = registry.status_at(id, fixed_at(30.0)).unwrap();
        assert_eq!(snap.status, SessionStatus::Stopped);
        assert_eq!(snap.elapsed_secs, 8.0);

        registry.signal(id, &leave(1, 21.0)).unwrap();
        registry.signal(id, &enter(2, 22.0)).unwrap();
        assert_eq!(registry.status(id).unwrap().current_step, 1);
        assert_eq!(registry.start(id), Err(SessionError::Finished));
    }

    #[test]
    fn remove_is_idempotent() {
        let (registry, id) = registry_with_two_steps();
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
        assert!(matches!(
            registry.status(id),
            Err(SessionError::UnknownSession(_))
        ));
    }

    #[test]
    fn list_shows_every_session() {
        let registry = SessionRegistry::new(fixed_clock());
        let a = registry.create(vec![step(1, 1, 5)], vec![zone(1)]).unwrap();
        let b = registry.create(vec![step(1, 1, 5)], vec![zone(1)]).unwrap();
        registry.start(b).unwrap();

        let listing = registry.list();
        assert_eq!(listing.len(), 2);
        let status_of = |id| {
            listing
                .iter()
                .find(|row| row.session_id == id)
                .map(|row| row.status)
        };
        assert_eq!(status_of(a), Some(SessionStatus::Ready));
        assert_eq!(status_of(b), Some(SessionStatus::Tracking));
    }
}
