use thiserror::Error;

use crate::model::ids::{EnvironmentId, ProcessId, ZoneId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepError {
    #[error("step position must be >= 1")]
    InvalidPosition,

    #[error("step name cannot be empty")]
    EmptyName,

    #[error("step target duration must be > 0 seconds")]
    InvalidTargetDuration,

    #[error("process name cannot be empty")]
    EmptyProcessName,
}

//
// ─── STEP ──────────────────────────────────────────────────────────────────────
//

/// One ordered unit of a procedure, bound to exactly one target zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    position: u32,
    name: String,
    target_zone: ZoneId,
    target_duration_secs: u32,
    description: Option<String>,
}

impl Step {
    /// Creates a step.
    ///
    /// # Errors
    ///
    /// Returns `StepError` if the position is zero, the name is blank, or the
    /// target duration is zero.
    pub fn new(
        position: u32,
        name: impl Into<String>,
        target_zone: ZoneId,
        target_duration_secs: u32,
        description: Option<String>,
    ) -> Result<Self, StepError> {
        if position == 0 {
            return Err(StepError::InvalidPosition);
        }
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(StepError::EmptyName);
        }
        if target_duration_secs == 0 {
            return Err(StepError::InvalidTargetDuration);
        }
        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            position,
            name,
            target_zone,
            target_duration_secs,
            description,
        })
    }

    /// 1-based position within the procedure.
    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn target_zone(&self) -> ZoneId {
        self.target_zone
    }

    #[must_use]
    pub fn target_duration_secs(&self) -> u32 {
        self.target_duration_secs
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

//
// ─── PROCESS ───────────────────────────────────────────────────────────────────
//

/// A named procedure defined for an environment. Its steps are loaded separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    id: ProcessId,
    environment_id: EnvironmentId,
    name: String,
    description: Option<String>,
}

impl Process {
    /// # Errors
    ///
    /// Returns `StepError::EmptyProcessName` if the trimmed name is empty.
    pub fn new(
        id: ProcessId,
        environment_id: EnvironmentId,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, StepError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(StepError::EmptyProcessName);
        }
        Ok(Self {
            id,
            environment_id,
            name,
            description,
        })
    }

    #[must_use]
    pub fn id(&self) -> ProcessId {
        self.id
    }

    #[must_use]
    pub fn environment_id(&self) -> EnvironmentId {
        self.environment_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Sorts steps into procedure order by their 1-based position.
pub fn order_steps(steps: &mut [Step]) {
    steps.sort_by_key(Step::position);
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_validation() {
        assert_eq!(
            Step::new(0, "Pick", ZoneId::new(1), 5, None).unwrap_err(),
            StepError::InvalidPosition
        );
        assert_eq!(
            Step::new(1, " ", ZoneId::new(1), 5, None).unwrap_err(),
            StepError::EmptyName
        );
        assert_eq!(
            Step::new(1, "Pick", ZoneId::new(1), 0, None).unwrap_err(),
            StepError::InvalidTargetDuration
        );
    }

    #[test]
    fn blank_description_is_dropped() {
        let step = Step::new(1, "Pick", ZoneId::new(1), 5, Some("  ".into())).unwrap();
        assert_eq!(step.description(), None);
    }

    #[test]
    fn order_steps_sorts_by_position() {
        let mut steps = vec![
            Step::new(3, "C", ZoneId::new(3), 5, None).unwrap(),
            Step::new(1, "A", ZoneId::new(1), 5, None).unwrap(),
            Step::new(2, "B", ZoneId::new(2), 5, None).unwrap(),
        ];
        order_steps(&mut steps);
        let names: Vec<&str> = steps.iter().map(Step::name).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn process_requires_name() {
        let err = Process::new(ProcessId::new(1), EnvironmentId::new(1), "", None).unwrap_err();
        assert_eq!(err, StepError::EmptyProcessName);
    }
}
