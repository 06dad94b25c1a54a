use sop_core::model::{Process, ProcessId, Step};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, process_from_row, step_from_row};
use crate::repository::{ProcessRepository, StorageError};

#[async_trait::async_trait]
impl ProcessRepository for SqliteRepository {
    async fn upsert_process(&self, process: &Process) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO processes (id, environment_id, name, description)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                environment_id = excluded.environment_id,
                name = excluded.name,
                description = excluded.description
            ",
        )
        .bind(id_to_i64("process_id", process.id().value())?)
        .bind(id_to_i64("environment_id", process.environment_id().value())?)
        .bind(process.name())
        .bind(process.description())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_process(&self, id: ProcessId) -> Result<Option<Process>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, environment_id, name, description
            FROM processes WHERE id = ?1
            ",
        )
        .bind(id_to_i64("process_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(process_from_row).transpose()
    }

    async fn replace_steps(
        &self,
        process_id: ProcessId,
        steps: &[Step],
    ) -> Result<(), StorageError> {
        let pid = id_to_i64("process_id", process_id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let exists = sqlx::query("SELECT 1 FROM processes WHERE id = ?1")
            .bind(pid)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        sqlx::query("DELETE FROM process_steps WHERE process_id = ?1")
            .bind(pid)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for step in steps {
            sqlx::query(
                r"
                INSERT INTO process_steps
                    (process_id, step_number, name, target_zone_id, duration_secs, description)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(pid)
            .bind(i64::from(step.position()))
            .bind(step.name())
            .bind(id_to_i64("target_zone_id", step.target_zone().value())?)
            .bind(i64::from(step.target_duration_secs()))
            .bind(step.description())
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
                other => conn(other),
            })?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_steps(&self, process_id: ProcessId) -> Result<Vec<Step>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT step_number, name, target_zone_id, duration_secs, description
            FROM process_steps
            WHERE process_id = ?1
            ORDER BY step_number ASC
            ",
        )
        .bind(id_to_i64("process_id", process_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(step_from_row).collect()
    }
}
