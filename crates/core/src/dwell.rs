//! Edge detection over per-frame zone containment.
//!
//! A detector reports containment for every zone on every frame. The tracker
//! keeps one latch per zone and only emits when the latch flips, so a hand
//! resting in a zone for many frames yields a single `Enter`.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::model::ZoneId;

/// Discrete transition derived from the containment signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Enter {
        at: DateTime<Utc>,
    },
    /// `dwell` is how long the zone was occupied since the matching `Enter`.
    Exit {
        at: DateTime<Utc>,
        dwell: Duration,
    },
}

/// Latch state for one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DwellState {
    pub inside: bool,
    pub entered_at: Option<DateTime<Utc>>,
}

/// Per-session set of zone latches, all starting outside.
#[derive(Debug, Clone, Default)]
pub struct DwellTracker {
    zones: HashMap<ZoneId, DwellState>,
}

impl DwellTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one containment sample; returns an edge only when the latch flips.
    pub fn observe(
        &mut self,
        zone_id: ZoneId,
        contained: bool,
        timestamp: DateTime<Utc>,
    ) -> Option<Edge> {
        let state = self.zones.entry(zone_id).or_default();
        match (state.inside, contained) {
            (false, true) => {
                state.inside = true;
                state.entered_at = Some(timestamp);
                Some(Edge::Enter { at: timestamp })
            }
            (true, false) => {
                state.inside = false;
                let dwell = state
                    .entered_at
                    .take()
                    .map_or_else(Duration::zero, |entered| timestamp - entered);
                Some(Edge::Exit {
                    at: timestamp,
                    dwell,
                })
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn state(&self, zone_id: ZoneId) -> DwellState {
        self.zones.get(&zone_id).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn is_inside(&self, zone_id: ZoneId) -> bool {
        self.state(zone_id).inside
    }

    /// Zones currently latched inside, ordered by id.
    #[must_use]
    pub fn occupied(&self) -> Vec<ZoneId> {
        let mut ids: Vec<ZoneId> = self
            .zones
            .iter()
            .filter(|(_, s)| s.inside)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_at;

    const ZONE: ZoneId = ZoneId::new(1);

    #[test]
    fn repeated_contained_frames_emit_one_enter() {
        let mut tracker = DwellTracker::new();
        let edges: Vec<_> = (0..30)
            .filter_map(|frame| tracker.observe(ZONE, true, fixed_at(f64::from(frame) / 30.0)))
            .collect();
        assert_eq!(edges, vec![Edge::Enter { at: fixed_at(0.0) }]);
        assert!(tracker.is_inside(ZONE));
    }

    #[test]
    fn exit_reports_dwell_and_rearms() {
        let mut tracker = DwellTracker::new();
        tracker.observe(ZONE, true, fixed_at(1.0));
        let exit = tracker.observe(ZONE, false, fixed_at(3.5));
        assert_eq!(
            exit,
            Some(Edge::Exit {
                at: fixed_at(3.5),
                dwell: Duration::milliseconds(2_500),
            })
        );
        assert_eq!(tracker.observe(ZONE, false, fixed_at(4.0)), None);
        assert_eq!(
            tracker.observe(ZONE, true, fixed_at(5.0)),
            Some(Edge::Enter { at: fixed_at(5.0) })
        );
    }

    #[test]
    fn exit_without_enter_is_ignored() {
        let mut tracker = DwellTracker::new();
        assert_eq!(tracker.observe(ZONE, false, fixed_at(0.0)), None);
        assert_eq!(tracker.state(ZONE), DwellState::default());
    }

    #[test]
    fn zones_latch_independently() {
        let mut tracker = DwellTracker::new();
        let other = ZoneId::new(2);
        tracker.observe(ZONE, true, fixed_at(0.0));
        assert!(tracker.observe(other, true, fixed_at(0.1)).is_some());
        assert_eq!(tracker.occupied(), vec![ZONE, other]);
    }
}
