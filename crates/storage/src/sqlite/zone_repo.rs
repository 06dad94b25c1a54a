use sop_core::model::{EnvironmentId, Zone};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, zone_from_row};
use crate::repository::{StorageError, ZoneRepository};

#[async_trait::async_trait]
impl ZoneRepository for SqliteRepository {
    async fn upsert_zone(
        &self,
        environment_id: EnvironmentId,
        zone: &Zone,
    ) -> Result<(), StorageError> {
        let rect = zone.rect();
        sqlx::query(
            r"
            INSERT INTO zones (id, environment_id, name, x_start, y_start, x_end, y_end, color)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                environment_id = excluded.environment_id,
                name = excluded.name,
                x_start = excluded.x_start,
                y_start = excluded.y_start,
                x_end = excluded.x_end,
                y_end = excluded.y_end,
                color = excluded.color
            ",
        )
        .bind(id_to_i64("zone_id", zone.id().value())?)
        .bind(id_to_i64("environment_id", environment_id.value())?)
        .bind(zone.name())
        .bind(rect.x_min)
        .bind(rect.y_min)
        .bind(rect.x_max)
        .bind(rect.y_max)
        .bind(zone.color().to_string())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_zones(&self, environment_id: EnvironmentId) -> Result<Vec<Zone>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, x_start, y_start, x_end, y_end, color
            FROM zones
            WHERE environment_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("environment_id", environment_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(zone_from_row).collect()
    }
}
