//! Hand positions from COCO-17 pose keypoints.
//!
//! The pose model reports wrists, not hands. A hand point is the wrist shifted
//! by `hand_offset_px` down, and toward +x for the left wrist or -x for the right.

use serde::{Deserialize, Serialize};

use crate::geometry::{self, Point};
use crate::model::{DetectorSettings, Zone};

/// Number of keypoints in the COCO pose layout.
pub const COCO_KEYPOINTS: usize = 17;
pub const LEFT_WRIST: usize = 9;
pub const RIGHT_WRIST: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    pub confidence: f32,
}

impl Keypoint {
    #[must_use]
    pub fn new(x: f64, y: f64, confidence: f32) -> Self {
        Self { x, y, confidence }
    }
}

/// Keypoints for one detected person, in COCO order. May be truncated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonKeypoints(pub Vec<Keypoint>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandSide {
    Left,
    Right,
}

/// Approximate hand location derived from a confident wrist keypoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPoint {
    pub side: HandSide,
    pub point: Point,
    pub confidence: f32,
}

impl HandPoint {
    /// Containment test against the configured confidence threshold.
    #[must_use]
    pub fn is_in(&self, zone: &Zone, settings: &DetectorSettings) -> bool {
        geometry::contains(
            self.point,
            zone,
            self.confidence,
            settings.confidence_threshold(),
        )
    }
}

impl PersonKeypoints {
    /// Hands whose wrist confidence exceeds the threshold.
    #[must_use]
    pub fn hands(&self, settings: &DetectorSettings) -> Vec<HandPoint> {
        let offset = settings.hand_offset_px();
        [
            (HandSide::Left, LEFT_WRIST, offset),
            (HandSide::Right, RIGHT_WRIST, -offset),
        ]
        .into_iter()
        .filter_map(|(side, idx, dx)| {
            let wrist = self.0.get(idx)?;
            if wrist.confidence <= settings.confidence_threshold() {
                return None;
            }
            Some(HandPoint {
                side,
                point: Point::new(wrist.x + dx, wrist.y + offset),
                confidence: wrist.confidence,
            })
        })
        .collect()
    }
}
