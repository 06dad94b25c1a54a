use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::ZoneId;

//
// ─── ZONE SIGNAL ───────────────────────────────────────────────────────────────
//

/// One per-frame containment report: "a tracked hand is (or is not) inside this zone".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneSignal {
    pub zone_id: ZoneId,
    pub contained: bool,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

impl ZoneSignal {
    #[must_use]
    pub fn new(
        zone_id: ZoneId,
        contained: bool,
        confidence: f32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            zone_id,
            contained,
            confidence,
            timestamp,
        }
    }
}

//
// ─── STEP EVENT ────────────────────────────────────────────────────────────────
//

/// Record of one completed step. Appended to a session log and never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    /// 1-based index of the completed step.
    pub step_index: usize,
    pub step_name: String,
    pub zone_name: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the previous event, or since session start for the first one.
    /// Negative if reporters delivered timestamps out of order.
    pub elapsed_secs: f64,
    pub target_duration_secs: u32,
}
