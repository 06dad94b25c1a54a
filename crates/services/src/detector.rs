//! Frame-to-signal conversion and the streaming detector task.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use sop_core::model::{DetectorSettings, SessionId, Zone, ZoneSignal};
use sop_core::pose::PersonKeypoints;

use crate::error::DetectorError;
use crate::registry::SessionRegistry;

/// One pose-model result: every person seen in a frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub people: Vec<PersonKeypoints>,
}

/// What a detector loop consumes: raw pose frames, or signals already
/// resolved upstream. Untagged on the wire; a `zone_id` field marks a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetectorInput {
    Signal(ZoneSignal),
    Frame(Frame),
}

impl DetectorInput {
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DetectorInput::Signal(signal) => signal.timestamp,
            DetectorInput::Frame(frame) => frame.timestamp,
        }
    }
}

impl From<Frame> for DetectorInput {
    fn from(frame: Frame) -> Self {
        DetectorInput::Frame(frame)
    }
}

impl From<ZoneSignal> for DetectorInput {
    fn from(signal: ZoneSignal) -> Self {
        DetectorInput::Signal(signal)
    }
}

/// Turns frames into one `ZoneSignal` per zone.
#[derive(Debug, Clone)]
pub struct ZoneDetector {
    zones: Vec<Zone>,
    settings: DetectorSettings,
}

impl ZoneDetector {
    #[must_use]
    pub fn new(zones: Vec<Zone>, settings: DetectorSettings) -> Self {
        Self { zones, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    #[must_use]
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// A zone is contained when any hand of any person is inside it. The
    /// signal carries the best confidence among hands inside, or among all
    /// hands when none is.
    #[must_use]
    pub fn detect(&self, frame: &Frame) -> Vec<ZoneSignal> {
        let hands: Vec<_> = frame
            .people
            .iter()
            .flat_map(|person| person.hands(&self.settings))
            .collect();
        let best_seen = hands.iter().map(|h| h.confidence).fold(0.0_f32, f32::max);

        self.zones
            .iter()
            .map(|zone| {
                let best_inside = hands
                    .iter()
                    .filter(|hand| hand.is_in(zone, &self.settings))
                    .map(|hand| hand.confidence)
                    .reduce(f32::max);
                ZoneSignal::new(
                    zone.id(),
                    best_inside.is_some(),
                    best_inside.unwrap_or(best_seen),
                    frame.timestamp,
                )
            })
            .collect()
    }
}

/// Counters reported when a detector loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DetectorStats {
    pub frames: u64,
    pub signals: u64,
    pub steps_completed: u64,
}

/// Feeds inputs into one session, in channel order, until the channel closes.
///
/// # Errors
///
/// Returns `DetectorError::Session` if the session disappears from the registry.
pub async fn run_detector(
    registry: Arc<SessionRegistry>,
    session_id: SessionId,
    detector: ZoneDetector,
    mut inputs: mpsc::Receiver<DetectorInput>,
) -> Result<DetectorStats, DetectorError> {
    let mut stats = DetectorStats::default();
    tracing::info!(session_id = %session_id, zones = detector.zones().len(), "detector started");

    while let Some(input) = inputs.recv().await {
        let signals = match input {
            DetectorInput::Frame(frame) => {
                stats.frames += 1;
                detector.detect(&frame)
            }
            DetectorInput::Signal(signal) => vec![signal],
        };
        for signal in signals {
            let outcome = registry.signal(session_id, &signal)?;
            stats.signals += 1;
            if outcome.completed_step().is_some() {
                stats.steps_completed += 1;
            }
        }
    }

    tracing::info!(
        session_id = %session_id,
        frames = stats.frames,
        steps_completed = stats.steps_completed,
        "detector finished"
    );
    Ok(stats)
}

/// Spawns [`run_detector`] on the current tokio runtime.
#[must_use]
pub fn spawn_detector(
    registry: Arc<SessionRegistry>,
    session_id: SessionId,
    detector: ZoneDetector,
    inputs: mpsc::Receiver<DetectorInput>,
) -> JoinHandle<Result<DetectorStats, DetectorError>> {
    tokio::spawn(run_detector(registry, session_id, detector, inputs))
}

/// Waits for a spawned detector and flattens join failures into `DetectorError`.
///
/// # Errors
///
/// Returns the loop's own error, or `DetectorError::Join` if the task panicked
/// or was cancelled.
pub async fn join_detector(
    handle: JoinHandle<Result<DetectorStats, DetectorError>>,
) -> Result<DetectorStats, DetectorError> {
    handle
        .await
        .map_err(|e| DetectorError::Join(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use sop_core::model::{Rect, Rgb, ZoneId};
    use sop_core::pose::{COCO_KEYPOINTS, Keypoint, LEFT_WRIST, RIGHT_WRIST};
    use sop_core::time::fixed_now;

    fn zone(id: u64, rect: Rect) -> Zone {
        Zone::new(ZoneId::new(id), format!("Zone {id}"), rect, Rgb::default()).unwrap()
    }

    fn person(left: Keypoint, right: Keypoint) -> PersonKeypoints {
        let mut kps = vec![Keypoint::new(0.0, 0.0, 0.0); COCO_KEYPOINTS];
        kps[LEFT_WRIST] = left;
        kps[RIGHT_WRIST] = right;
        PersonKeypoints(kps)
    }

    fn detector() -> ZoneDetector {
        ZoneDetector::new(
            vec![
                zone(1, Rect::new(0.0, 0.0, 100.0, 100.0)),
                zone(2, Rect::new(200.0, 0.0, 300.0, 100.0)),
            ],
            DetectorSettings::default(),
        )
    }

    #[test]
    fn one_signal_per_zone_per_frame() {
        let frame = Frame {
            timestamp: fixed_now(),
            people: Vec::new(),
        };
        let signals = detector().detect(&frame);
        assert_eq!(signals.len(), 2);
        assert!(signals.iter().all(|s| !s.contained));
        assert!(signals.iter().all(|s| s.confidence == 0.0));
    }

    #[test]
    fn either_hand_marks_zone_contained() {
        // Left wrist (20, 20) lands at (50, 50); right wrist (280, 20) at (250, 50).
        let frame = Frame {
            timestamp: fixed_now(),
            people: vec![person(
                Keypoint::new(20.0, 20.0, 0.9),
                Keypoint::new(280.0, 20.0, 0.7),
            )],
        };
        let signals = detector().detect(&frame);
        assert!(signals[0].contained);
        assert_eq!(signals[0].confidence, 0.9);
        assert!(signals[1].contained);
        assert_eq!(signals[1].confidence, 0.7);
    }

    #[test]
    fn low_confidence_wrists_are_ignored() {
        let frame = Frame {
            timestamp: fixed_now(),
            people: vec![person(
                Keypoint::new(20.0, 20.0, 0.4),
                Keypoint::new(280.0, 20.0, 0.5),
            )],
        };
        assert!(detector().detect(&frame).iter().all(|s| !s.contained));
    }

    #[test]
    fn input_with_zone_id_is_a_signal() {
        let input: DetectorInput = serde_json::from_str(
            r#"{"zone_id":3,"contained":true,"confidence":0.8,"timestamp":"2023-11-14T22:13:20Z"}"#,
        )
        .unwrap();
        assert!(matches!(input, DetectorInput::Signal(s) if s.zone_id == ZoneId::new(3)));

        let input: DetectorInput =
            serde_json::from_str(r#"{"timestamp":"2023-11-14T22:13:20Z","people":[]}"#).unwrap();
        assert!(matches!(input, DetectorInput::Frame(_)));
        assert_eq!(input.timestamp(), fixed_now());
    }

    #[test]
    fn frame_parses_without_people() {
        let frame: Frame = serde_json::from_str(r#"{"timestamp":"2023-11-14T22:13:20Z"}"#).unwrap();
        assert_eq!(frame.timestamp, fixed_now());
        assert!(frame.people.is_empty());
    }
}
