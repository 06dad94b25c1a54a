//! Shared error types for the services crate.

use thiserror::Error;

use sop_core::SessionError;
use sop_core::model::{EnvironmentId, ProcessId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `TrackingService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackingError {
    #[error("process {0} not found")]
    ProcessNotFound(ProcessId),
    #[error("process {process} belongs to environment {actual}, not {requested}")]
    EnvironmentMismatch {
        process: ProcessId,
        requested: EnvironmentId,
        actual: EnvironmentId,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

/// Errors that end a detector loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DetectorError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("detector task failed: {0}")]
    Join(String),
}
