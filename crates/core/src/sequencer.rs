//! Forward-only step state machine for one session.
//!
//! `Ready -> Tracking -> {Completed | Stopped}`. Only the exact next target
//! zone advances the pointer; everything else is a silent no-op reported
//! through `EnterOutcome` so callers can log it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::adherence::{self, AdherenceReport};
use crate::error::SessionError;
use crate::model::{Step, StepEvent, ZoneId, ZoneIndex};
use crate::time::duration_secs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Ready,
    Tracking,
    Completed,
    Stopped,
}

impl SessionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Stopped)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Ready => "ready",
            SessionStatus::Tracking => "tracking",
            SessionStatus::Completed => "completed",
            SessionStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an `Enter` edge did to the sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum EnterOutcome {
    /// Session is not `Tracking`; nothing changed.
    NotTracking(SessionStatus),
    /// Every step is already done.
    AlreadyComplete,
    /// Entered a zone other than the next step's target.
    WrongZone { expected: ZoneId, got: ZoneId },
    StepCompleted(StepEvent),
    /// The final step was completed; the session is now `Completed`.
    ProcessCompleted(StepEvent),
}

impl EnterOutcome {
    #[must_use]
    pub fn event(&self) -> Option<&StepEvent> {
        match self {
            EnterOutcome::StepCompleted(e) | EnterOutcome::ProcessCompleted(e) => Some(e),
            _ => None,
        }
    }
}

/// Ordered steps, current-step pointer, and completion log for one session.
#[derive(Debug, Clone)]
pub struct StepSequencer {
    steps: Vec<Step>,
    zone_names: Vec<String>,
    status: SessionStatus,
    current_step: usize,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    finalized_at: Option<DateTime<Utc>>,
    events: Vec<StepEvent>,
    report: Option<AdherenceReport>,
}

impl StepSequencer {
    /// Builds a sequencer in `Ready`. `steps` must already be in procedure order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownTargetZone` if a step targets a zone
    /// missing from `zones`.
    pub fn new(steps: Vec<Step>, zones: &ZoneIndex) -> Result<Self, SessionError> {
        let zone_names = steps
            .iter()
            .map(|step| {
                zones
                    .get(step.target_zone())
                    .map(|z| z.name().to_string())
                    .ok_or(SessionError::UnknownTargetZone {
                        position: step.position(),
                        zone: step.target_zone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            steps,
            zone_names,
            status: SessionStatus::Ready,
            current_step: 0,
            started_at: None,
            completed_at: None,
            finalized_at: None,
            events: Vec::new(),
            report: None,
        })
    }

    /// Moves `Ready` to `Tracking`. Starting an already-tracking session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSteps` for an empty procedure and
    /// `SessionError::Finished` once the session is terminal.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.status.is_terminal() {
            return Err(SessionError::Finished);
        }
        if self.status == SessionStatus::Tracking {
            return Ok(());
        }
        if self.steps.is_empty() {
            return Err(SessionError::NoSteps);
        }
        self.status = SessionStatus::Tracking;
        self.started_at = Some(now);
        Ok(())
    }

    /// Evaluates an `Enter` edge for `zone_id` at `timestamp`.
    pub fn on_enter(&mut self, zone_id: ZoneId, timestamp: DateTime<Utc>) -> EnterOutcome {
        if self.status != SessionStatus::Tracking {
            return EnterOutcome::NotTracking(self.status);
        }
        let Some(expected) = self.steps.get(self.current_step) else {
            return EnterOutcome::AlreadyComplete;
        };
        if zone_id != expected.target_zone() {
            return EnterOutcome::WrongZone {
                expected: expected.target_zone(),
                got: zone_id,
            };
        }

        let reference = self
            .events
            .last()
            .map(|e| e.timestamp)
            .or(self.started_at)
            .unwrap_or(timestamp);
        let event = StepEvent {
            step_index: self.current_step + 1,
            step_name: expected.name().to_string(),
            zone_name: self.zone_names[self.current_step].clone(),
            timestamp,
            elapsed_secs: duration_secs(timestamp - reference),
            target_duration_secs: expected.target_duration_secs(),
        };
        self.events.push(event.clone());
        self.current_step += 1;

        if self.current_step == self.steps.len() {
            self.status = SessionStatus::Completed;
            self.completed_at = Some(timestamp);
            EnterOutcome::ProcessCompleted(event)
        } else {
            EnterOutcome::StepCompleted(event)
        }
    }

    /// Finalizes the session and scores it.
    ///
    /// `Tracking` becomes `Stopped`; `Completed` stays `Completed`. The first
    /// call fixes the report; later calls return it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotTracking` if the session never started.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<AdherenceReport, SessionError> {
        if let Some(report) = &self.report {
            return Ok(report.clone());
        }
        let started_at = match (self.status, self.started_at) {
            (SessionStatus::Tracking | SessionStatus::Completed, Some(started_at)) => started_at,
            _ => return Err(SessionError::NotTracking),
        };

        if self.status == SessionStatus::Tracking {
            self.status = SessionStatus::Stopped;
        }
        self.finalized_at = Some(now);

        let report = adherence::calculate(
            &self.events,
            &self.steps,
            duration_secs(now - started_at),
        );
        self.report = Some(report.clone());
        Ok(report)
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn events(&self) -> &[StepEvent] {
        &self.events
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.report.is_some()
    }

    /// The step the operator should do next, with its target zone name.
    #[must_use]
    pub fn next_step(&self) -> Option<(&Step, &str)> {
        let step = self.steps.get(self.current_step)?;
        Some((step, self.zone_names[self.current_step].as_str()))
    }

    /// Seconds the session has been (or was) running as of `now`.
    #[must_use]
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> f64 {
        let Some(started_at) = self.started_at else {
            return 0.0;
        };
        let end = self.finalized_at.or(self.completed_at).unwrap_or(now);
        duration_secs(end - started_at)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adherence::AdherenceOutcome;
    use crate::model::{Rect, Rgb, Zone};
    use crate::time::{fixed_at, fixed_now};

    fn zones(ids: &[u64]) -> ZoneIndex {
        ZoneIndex::new(ids.iter().map(|id| {
            Zone::new(
                ZoneId::new(*id),
                format!("Zone {id}"),
                Rect::new(0.0, 0.0, 10.0, 10.0),
                Rgb::default(),
            )
            .unwrap()
        }))
        .unwrap()
    }

    fn sequencer(targets: &[u64]) -> StepSequencer {
        let steps = targets
            .iter()
            .enumerate()
            .map(|(i, zone)| {
                let pos = u32::try_from(i + 1).unwrap();
                Step::new(pos, format!("Step {pos}"), ZoneId::new(*zone), 5, None).unwrap()
            })
            .collect();
        StepSequencer::new(steps, &zones(&[1, 2, 3])).unwrap()
    }

    #[test]
    fn unknown_target_zone_is_rejected() {
        let steps = vec![Step::new(1, "Pick", ZoneId::new(9), 5, None).unwrap()];
        let err = StepSequencer::new(steps, &zones(&[1])).unwrap_err();
        assert!(matches!(err, SessionError::UnknownTargetZone { position: 1, .. }));
    }

    #[test]
    fn start_requires_steps() {
        let mut seq = StepSequencer::new(Vec::new(), &zones(&[1])).unwrap();
        assert_eq!(seq.start(fixed_now()).unwrap_err(), SessionError::NoSteps);
        assert_eq!(seq.status(), SessionStatus::Ready);
        assert!(!seq.status().is_terminal());
    }

    #[test]
    fn enters_before_start_are_ignored() {
        let mut seq = sequencer(&[1, 2]);
        let outcome = seq.on_enter(ZoneId::new(1), fixed_now());
        assert_eq!(outcome, EnterOutcome::NotTracking(SessionStatus::Ready));
        assert_eq!(seq.current_step(), 0);
    }

    #[test]
    fn correct_zone_advances_with_elapsed_from_previous_event() {
        let mut seq = sequencer(&[1, 2, 3]);
        seq.start(fixed_now()).unwrap();

        let first = seq.on_enter(ZoneId::new(1), fixed_at(2.0));
        assert_eq!(first.event().unwrap().elapsed_secs, 2.0);

        let second = seq.on_enter(ZoneId::new(2), fixed_at(9.5));
        let event = second.event().unwrap();
        assert_eq!(event.step_index, 2);
        assert_eq!(event.zone_name, "Zone 2");
        assert_eq!(event.elapsed_secs, 7.5);
        assert_eq!(seq.current_step(), 2);
        assert_eq!(seq.status(), SessionStatus::Tracking);
    }

    #[test]
    fn out_of_order_zone_does_not_advance() {
        let mut seq = sequencer(&[1, 2, 3]);
        seq.start(fixed_now()).unwrap();

        let outcome = seq.on_enter(ZoneId::new(3), fixed_at(1.0));
        assert_eq!(
            outcome,
            EnterOutcome::WrongZone {
                expected: ZoneId::new(1),
                got: ZoneId::new(3),
            }
        );
        assert_eq!(seq.current_step(), 0);
        assert!(seq.events().is_empty());
    }

    #[test]
    fn last_step_completes_and_freezes_sequence() {
        let mut seq = sequencer(&[1, 2]);
        seq.start(fixed_now()).unwrap();
        seq.on_enter(ZoneId::new(1), fixed_at(1.0));
        let done = seq.on_enter(ZoneId::new(2), fixed_at(4.0));

        assert!(matches!(done, EnterOutcome::ProcessCompleted(_)));
        assert_eq!(seq.status(), SessionStatus::Completed);
        assert_eq!(seq.completed_at(), Some(fixed_at(4.0)));
        assert!(seq.next_step().is_none());

        let late = seq.on_enter(ZoneId::new(1), fixed_at(6.0));
        assert_eq!(late, EnterOutcome::NotTracking(SessionStatus::Completed));
        assert_eq!(seq.events().len(), 2);
    }

    #[test]
    fn repeated_step_zone_only_counts_once() {
        // Same zone used by consecutive steps still needs one enter per step.
        let mut seq = sequencer(&[1, 1]);
        seq.start(fixed_now()).unwrap();
        seq.on_enter(ZoneId::new(1), fixed_at(1.0));
        assert_eq!(seq.current_step(), 1);
        seq.on_enter(ZoneId::new(1), fixed_at(2.0));
        assert_eq!(seq.status(), SessionStatus::Completed);
    }

    #[test]
    fn stop_before_start_is_not_tracking() {
        let mut seq = sequencer(&[1]);
        assert_eq!(seq.stop(fixed_now()).unwrap_err(), SessionError::NotTracking);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut seq = sequencer(&[1, 2]);
        seq.start(fixed_now()).unwrap();
        seq.on_enter(ZoneId::new(1), fixed_at(3.0));

        let first = seq.stop(fixed_at(10.0)).unwrap();
        let second = seq.stop(fixed_at(99.0)).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.total_time_secs, 10.0);
        assert_eq!(seq.status(), SessionStatus::Stopped);
        assert_eq!(seq.events().len(), 1);
        assert_eq!(seq.elapsed_secs(fixed_at(500.0)), 10.0);
        assert_eq!(seq.start(fixed_at(100.0)).unwrap_err(), SessionError::Finished);
    }

    #[test]
    fn stop_after_completion_keeps_completed_status() {
        let mut seq = sequencer(&[1]);
        seq.start(fixed_now()).unwrap();
        seq.on_enter(ZoneId::new(1), fixed_at(5.0));

        let report = seq.stop(fixed_at(8.0)).unwrap();
        assert_eq!(seq.status(), SessionStatus::Completed);
        assert_eq!(report.completion_adherence, 100.0);
        assert_eq!(report.total_time_secs, 8.0);
        assert!(seq.status().is_terminal());
        assert_eq!(seq.start(fixed_at(9.0)).unwrap_err(), SessionError::Finished);
    }

    #[test]
    fn stop_without_events_reports_nothing_completed() {
        let mut seq = sequencer(&[1, 2]);
        seq.start(fixed_now()).unwrap();
        let report = seq.stop(fixed_at(4.0)).unwrap();
        assert_eq!(report.outcome, AdherenceOutcome::NoStepsCompleted);
        assert_eq!(report.overall_adherence, 0.0);
    }

    #[test]
    fn elapsed_tracks_lifecycle() {
        let mut seq = sequencer(&[1]);
        assert_eq!(seq.elapsed_secs(fixed_at(3.0)), 0.0);
        seq.start(fixed_now()).unwrap();
        assert_eq!(seq.elapsed_secs(fixed_at(3.0)), 3.0);
        seq.on_enter(ZoneId::new(1), fixed_at(4.0));
        assert_eq!(seq.elapsed_secs(fixed_at(30.0)), 4.0);
    }
}
