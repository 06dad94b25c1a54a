use thiserror::Error;

/// Default keypoint confidence a hand must exceed to count as detected.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Default pixel offset from a wrist keypoint to the approximate hand center.
pub const DEFAULT_HAND_OFFSET_PX: f64 = 30.0;

/// Tuning knobs for turning pose keypoints into zone containment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorSettings {
    confidence_threshold: f32,
    hand_offset_px: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DetectorSettingsDraft {
    pub confidence_threshold: Option<f32>,
    pub hand_offset_px: Option<f64>,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("confidence threshold must be in [0, 1): {0}")]
    InvalidConfidenceThreshold(f32),

    #[error("hand offset must be a finite, non-negative pixel count: {0}")]
    InvalidHandOffset(f64),
}

impl DetectorSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the draft, filling unset fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if a provided value is out of range.
    pub fn validate(self) -> Result<DetectorSettings, SettingsError> {
        let confidence_threshold = self
            .confidence_threshold
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);
        if !(0.0..1.0).contains(&confidence_threshold) {
            return Err(SettingsError::InvalidConfidenceThreshold(
                confidence_threshold,
            ));
        }

        let hand_offset_px = self.hand_offset_px.unwrap_or(DEFAULT_HAND_OFFSET_PX);
        if !hand_offset_px.is_finite() || hand_offset_px < 0.0 {
            return Err(SettingsError::InvalidHandOffset(hand_offset_px));
        }

        Ok(DetectorSettings {
            confidence_threshold,
            hand_offset_px,
        })
    }
}

impl DetectorSettings {
    /// # Errors
    ///
    /// Returns `SettingsError` if either value is out of range.
    pub fn new(confidence_threshold: f32, hand_offset_px: f64) -> Result<Self, SettingsError> {
        DetectorSettingsDraft {
            confidence_threshold: Some(confidence_threshold),
            hand_offset_px: Some(hand_offset_px),
        }
        .validate()
    }

    #[must_use]
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    #[must_use]
    pub fn hand_offset_px(&self) -> f64 {
        self.hand_offset_px
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            hand_offset_px: DEFAULT_HAND_OFFSET_PX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_yields_defaults() {
        let settings = DetectorSettingsDraft::new().validate().unwrap();
        assert_eq!(settings, DetectorSettings::default());
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(matches!(
            DetectorSettings::new(1.0, 30.0),
            Err(SettingsError::InvalidConfidenceThreshold(_))
        ));
        assert!(matches!(
            DetectorSettings::new(0.5, -1.0),
            Err(SettingsError::InvalidHandOffset(_))
        ));
        assert!(matches!(
            DetectorSettings::new(0.5, f64::NAN),
            Err(SettingsError::InvalidHandOffset(_))
        ));
    }
}
