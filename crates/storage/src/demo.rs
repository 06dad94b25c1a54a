//! Demo workstation layout used by the `seed` binary and the app's `seed` command.

use sop_core::model::{
    EnvironmentId, Process, ProcessId, Rect, Rgb, Step, StepError, Zone, ZoneError, ZoneId,
};
use thiserror::Error;

use crate::repository::{Storage, StorageError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Zone(#[from] ZoneError),
    #[error(transparent)]
    Step(#[from] StepError),
}

/// What a seeding run wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub environment_id: EnvironmentId,
    pub process_id: ProcessId,
    pub zones: usize,
    pub steps: usize,
}

/// Zone ids for an environment are `environment_id * 10 + n` so several demo
/// environments can share one database.
fn demo_zone_id(environment_id: EnvironmentId, n: u64) -> ZoneId {
    ZoneId::new(environment_id.value().saturating_mul(10).saturating_add(n))
}

/// Three zones across a 1280x720 frame: parts bin, assembly area, inspection.
///
/// # Errors
///
/// Returns `ZoneError` if a zone fails validation.
pub fn demo_zones(environment_id: EnvironmentId) -> Result<Vec<Zone>, ZoneError> {
    Ok(vec![
        Zone::new(
            demo_zone_id(environment_id, 1),
            "Parts Bin",
            Rect::new(100.0, 100.0, 300.0, 300.0),
            "#FF0000".parse::<Rgb>()?,
        )?,
        Zone::new(
            demo_zone_id(environment_id, 2),
            "Assembly Area",
            Rect::new(500.0, 100.0, 800.0, 400.0),
            "#00FF00".parse::<Rgb>()?,
        )?,
        Zone::new(
            demo_zone_id(environment_id, 3),
            "Inspection",
            Rect::new(900.0, 100.0, 1150.0, 350.0),
            "#0000FF".parse::<Rgb>()?,
        )?,
    ])
}

/// Pick, assemble, inspect; one step per demo zone.
///
/// # Errors
///
/// Returns `StepError` if a step fails validation.
pub fn demo_steps(environment_id: EnvironmentId) -> Result<Vec<Step>, StepError> {
    Ok(vec![
        Step::new(
            1,
            "Pick part",
            demo_zone_id(environment_id, 1),
            5,
            Some("Take one part from the bin".into()),
        )?,
        Step::new(
            2,
            "Assemble",
            demo_zone_id(environment_id, 2),
            10,
            Some("Mount the part on the fixture".into()),
        )?,
        Step::new(
            3,
            "Inspect",
            demo_zone_id(environment_id, 3),
            5,
            Some("Check the result under the lamp".into()),
        )?,
    ])
}

/// Upsert the demo environment and process into `storage`. Re-running replaces
/// the process steps.
///
/// # Errors
///
/// Returns `SeedError` if validation or a repository call fails.
pub async fn seed_demo(
    storage: &Storage,
    environment_id: EnvironmentId,
    process_id: ProcessId,
) -> Result<SeedSummary, SeedError> {
    let zones = demo_zones(environment_id)?;
    for zone in &zones {
        storage.zones.upsert_zone(environment_id, zone).await?;
    }

    let process = Process::new(
        process_id,
        environment_id,
        "Demo assembly",
        Some("Pick, assemble, inspect".into()),
    )?;
    storage.processes.upsert_process(&process).await?;

    let steps = demo_steps(environment_id)?;
    storage.processes.replace_steps(process_id, &steps).await?;

    Ok(SeedSummary {
        environment_id,
        process_id,
        zones: zones.len(),
        steps: steps.len(),
    })
}
