use sop_core::model::{EnvironmentId, Process, ProcessId, Rect, Rgb, Step, Zone, ZoneId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn zone_from_row(row: &SqliteRow) -> Result<Zone, StorageError> {
    let id = ZoneId::new(i64_to_u64("zone_id", row.try_get("id").map_err(ser)?)?);
    let rect = Rect::new(
        row.try_get("x_start").map_err(ser)?,
        row.try_get("y_start").map_err(ser)?,
        row.try_get("x_end").map_err(ser)?,
        row.try_get("y_end").map_err(ser)?,
    );
    let color: Rgb = row
        .try_get::<String, _>("color")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    Zone::new(id, row.try_get::<String, _>("name").map_err(ser)?, rect, color).map_err(ser)
}

pub(crate) fn process_from_row(row: &SqliteRow) -> Result<Process, StorageError> {
    Process::new(
        ProcessId::new(i64_to_u64("process_id", row.try_get("id").map_err(ser)?)?),
        EnvironmentId::new(i64_to_u64(
            "environment_id",
            row.try_get("environment_id").map_err(ser)?,
        )?),
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn step_from_row(row: &SqliteRow) -> Result<Step, StorageError> {
    Step::new(
        i64_to_u32("step_number", row.try_get("step_number").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        ZoneId::new(i64_to_u64(
            "target_zone_id",
            row.try_get("target_zone_id").map_err(ser)?,
        )?),
        i64_to_u32("duration_secs", row.try_get("duration_secs").map_err(ser)?)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
    )
    .map_err(ser)
}
