use thiserror::Error;

use crate::model::{SessionId, ZoneId};

/// Errors a caller can see from the session lifecycle.
///
/// Noisy-but-normal detector input (wrong zone, repeated enter, late signals)
/// never maps to one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),

    #[error("session is not tracking")]
    NotTracking,

    #[error("cannot start a session without steps")]
    NoSteps,

    #[error("zone {zone} has a degenerate rectangle (min > max)")]
    InvalidZoneGeometry { zone: ZoneId },

    #[error("step {position} targets zone {zone}, which is not part of the environment")]
    UnknownTargetZone { position: u32, zone: ZoneId },

    #[error("session already finished")]
    Finished,
}
