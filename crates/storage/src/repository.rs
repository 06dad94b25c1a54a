use async_trait::async_trait;
use sop_core::model::{EnvironmentId, Process, ProcessId, Step, Zone, ZoneId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Zones configured for each environment.
#[async_trait]
pub trait ZoneRepository: Send + Sync {
    /// Persist or update a zone.
    ///
    /// Zone ids are global: upserting an existing id under another
    /// environment moves the zone there.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the zone cannot be stored.
    async fn upsert_zone(&self, environment_id: EnvironmentId, zone: &Zone)
    -> Result<(), StorageError>;

    /// All zones of an environment, ordered by id. Empty if the environment has none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_zones(&self, environment_id: EnvironmentId) -> Result<Vec<Zone>, StorageError>;
}

/// Processes and their ordered steps.
#[async_trait]
pub trait ProcessRepository: Send + Sync {
    /// Persist or update a process header.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the process cannot be stored.
    async fn upsert_process(&self, process: &Process) -> Result<(), StorageError>;

    /// Fetch a process by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_process(&self, id: ProcessId) -> Result<Option<Process>, StorageError>;

    /// Replace every step of a process.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the process does not exist,
    /// `StorageError::Conflict` if two steps share a position.
    async fn replace_steps(&self, process_id: ProcessId, steps: &[Step])
    -> Result<(), StorageError>;

    /// Steps of a process in procedure order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn get_steps(&self, process_id: ProcessId) -> Result<Vec<Step>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    zones: Arc<Mutex<BTreeMap<ZoneId, (EnvironmentId, Zone)>>>,
    processes: Arc<Mutex<HashMap<ProcessId, Process>>>,
    steps: Arc<Mutex<HashMap<ProcessId, BTreeMap<u32, Step>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ZoneRepository for InMemoryRepository {
    async fn upsert_zone(
        &self,
        environment_id: EnvironmentId,
        zone: &Zone,
    ) -> Result<(), StorageError> {
        let mut guard = self.zones.lock().map_err(poisoned)?;
        guard.insert(zone.id(), (environment_id, zone.clone()));
        Ok(())
    }

    async fn get_zones(&self, environment_id: EnvironmentId) -> Result<Vec<Zone>, StorageError> {
        let guard = self.zones.lock().map_err(poisoned)?;
        Ok(guard
            .values()
            .filter(|(env, _)| *env == environment_id)
            .map(|(_, zone)| zone.clone())
            .collect())
    }
}

#[async_trait]
impl ProcessRepository for InMemoryRepository {
    async fn upsert_process(&self, process: &Process) -> Result<(), StorageError> {
        let mut guard = self.processes.lock().map_err(poisoned)?;
        guard.insert(process.id(), process.clone());
        Ok(())
    }

    async fn get_process(&self, id: ProcessId) -> Result<Option<Process>, StorageError> {
        let guard = self.processes.lock().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    async fn replace_steps(
        &self,
        process_id: ProcessId,
        steps: &[Step],
    ) -> Result<(), StorageError> {
        if !self.processes.lock().map_err(poisoned)?.contains_key(&process_id) {
            return Err(StorageError::NotFound);
        }
        let mut ordered = BTreeMap::new();
        for step in steps {
            if ordered.insert(step.position(), step.clone()).is_some() {
                return Err(StorageError::Conflict);
            }
        }
        let mut guard = self.steps.lock().map_err(poisoned)?;
        guard.insert(process_id, ordered);
        Ok(())
    }

    async fn get_steps(&self, process_id: ProcessId) -> Result<Vec<Step>, StorageError> {
        let guard = self.steps.lock().map_err(poisoned)?;
        Ok(guard
            .get(&process_id)
            .map(|steps| steps.values().cloned().collect())
            .unwrap_or_default())
    }
}

/// Repository handles used by the tracking services.
#[derive(Clone)]
pub struct Storage {
    pub zones: Arc<dyn ZoneRepository>,
    pub processes: Arc<dyn ProcessRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let zones: Arc<dyn ZoneRepository> = Arc::new(repo.clone());
        let processes: Arc<dyn ProcessRepository> = Arc::new(repo);
        Self { zones, processes }
    }
}
