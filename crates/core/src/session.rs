//! A tracking session: zone snapshot, dwell latches, and step sequencer
//! advanced together by one containment signal at a time.

use chrono::{DateTime, Duration, Utc};

use crate::adherence::AdherenceReport;
use crate::dwell::{DwellTracker, Edge};
use crate::error::SessionError;
use crate::model::{Step, StepEvent, Zone, ZoneId, ZoneIndex, ZoneSignal};
use crate::sequencer::{EnterOutcome, SessionStatus, StepSequencer};

/// Why a signal was dropped before reaching the dwell latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotTracking(SessionStatus),
    UnknownZone(ZoneId),
}

/// Effect of applying one `ZoneSignal`.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    Ignored(IgnoreReason),
    /// Containment unchanged since the last signal for this zone.
    Unchanged,
    Exited { zone: ZoneId, dwell: Duration },
    Entered { zone: ZoneId, outcome: EnterOutcome },
}

impl SignalOutcome {
    /// The step completed by this signal, if any.
    #[must_use]
    pub fn completed_step(&self) -> Option<&StepEvent> {
        match self {
            SignalOutcome::Entered { outcome, .. } => outcome.event(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    zones: ZoneIndex,
    dwell: DwellTracker,
    sequencer: StepSequencer,
    created_at: DateTime<Utc>,
}

impl Session {
    /// Snapshots zones and steps for the lifetime of the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidZoneGeometry` for a degenerate zone and
    /// `SessionError::UnknownTargetZone` when a step targets a missing zone.
    pub fn new(
        steps: Vec<Step>,
        zones: Vec<Zone>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let zones = ZoneIndex::new(zones)?;
        let sequencer = StepSequencer::new(steps, &zones)?;
        Ok(Self {
            zones,
            dwell: DwellTracker::new(),
            sequencer,
            created_at,
        })
    }

    /// # Errors
    ///
    /// See `StepSequencer::start`.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.sequencer.start(now)
    }

    /// Runs the dwell latch and, on an `Enter` edge, the sequencer.
    ///
    /// Signals are only applied while `Tracking`.
    pub fn apply(&mut self, signal: &ZoneSignal) -> SignalOutcome {
        let status = self.sequencer.status();
        if status != SessionStatus::Tracking {
            return SignalOutcome::Ignored(IgnoreReason::NotTracking(status));
        }
        if !self.zones.contains_zone(signal.zone_id) {
            return SignalOutcome::Ignored(IgnoreReason::UnknownZone(signal.zone_id));
        }

        match self
            .dwell
            .observe(signal.zone_id, signal.contained, signal.timestamp)
        {
            None => SignalOutcome::Unchanged,
            Some(Edge::Exit { dwell, .. }) => SignalOutcome::Exited {
                zone: signal.zone_id,
                dwell,
            },
            Some(Edge::Enter { at }) => SignalOutcome::Entered {
                zone: signal.zone_id,
                outcome: self.sequencer.on_enter(signal.zone_id, at),
            },
        }
    }

    /// # Errors
    ///
    /// See `StepSequencer::stop`.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<AdherenceReport, SessionError> {
        self.sequencer.stop(now)
    }

    #[must_use]
    pub fn sequencer(&self) -> &StepSequencer {
        &self.sequencer
    }

    #[must_use]
    pub fn zones(&self) -> &ZoneIndex {
        &self.zones
    }

    #[must_use]
    pub fn dwell(&self) -> &DwellTracker {
        &self.dwell
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.sequencer.status()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
