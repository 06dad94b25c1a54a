use std::sync::Arc;

use sop_core::model::{DetectorSettings, EnvironmentId, ProcessId, SessionId, order_steps};
use sop_core::{AdherenceReport, Clock};
use storage::repository::{ProcessRepository, Storage, ZoneRepository};

use crate::detector::ZoneDetector;
use crate::error::TrackingError;
use crate::registry::SessionRegistry;

/// A session opened from stored configuration, with a detector for its zones.
#[derive(Debug, Clone)]
pub struct OpenedSession {
    pub session_id: SessionId,
    pub detector: ZoneDetector,
}

/// Opens sessions from stored processes and zones, then hands them to the registry.
#[derive(Clone)]
pub struct TrackingService {
    registry: Arc<SessionRegistry>,
    zones: Arc<dyn ZoneRepository>,
    processes: Arc<dyn ProcessRepository>,
    settings: DetectorSettings,
}

impl TrackingService {
    #[must_use]
    pub fn new(
        clock: Clock,
        zones: Arc<dyn ZoneRepository>,
        processes: Arc<dyn ProcessRepository>,
        settings: DetectorSettings,
    ) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new(clock)),
            zones,
            processes,
            settings,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage, settings: DetectorSettings) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.zones),
            Arc::clone(&storage.processes),
            settings,
        )
    }

    /// Build a service backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Sqlite` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: DetectorSettings,
    ) -> Result<Self, TrackingError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(clock, &storage, settings))
    }

    #[must_use]
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    #[must_use]
    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Snapshots the process steps and environment zones into a new `Ready` session.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::ProcessNotFound` for an unknown process,
    /// `TrackingError::EnvironmentMismatch` if the process belongs elsewhere,
    /// `TrackingError::Storage` on repository failures, and
    /// `TrackingError::Session` if the snapshot is inconsistent.
    pub async fn open_session(
        &self,
        environment_id: EnvironmentId,
        process_id: ProcessId,
    ) -> Result<OpenedSession, TrackingError> {
        let process = self
            .processes
            .get_process(process_id)
            .await?
            .ok_or(TrackingError::ProcessNotFound(process_id))?;
        if process.environment_id() != environment_id {
            return Err(TrackingError::EnvironmentMismatch {
                process: process_id,
                requested: environment_id,
                actual: process.environment_id(),
            });
        }

        let mut steps = self.processes.get_steps(process_id).await?;
        order_steps(&mut steps);
        let zones = self.zones.get_zones(environment_id).await?;

        let detector = ZoneDetector::new(zones.clone(), self.settings);
        let session_id = self.registry.create(steps, zones)?;
        tracing::info!(
            session_id = %session_id,
            environment_id = %environment_id,
            process_id = %process_id,
            process = process.name(),
            "session opened"
        );

        Ok(OpenedSession {
            session_id,
            detector,
        })
    }

    /// Stops a session and drops it from the registry.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError::Session` if the session is unknown or never started.
    pub fn close_session(&self, session_id: SessionId) -> Result<AdherenceReport, TrackingError> {
        let report = self.registry.stop(session_id)?;
        self.registry.remove(session_id);
        Ok(report)
    }
}
