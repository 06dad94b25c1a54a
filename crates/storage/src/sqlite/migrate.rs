use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates zones, processes, and process steps.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS zones (
                    id INTEGER PRIMARY KEY,
                    environment_id INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    x_start REAL NOT NULL,
                    y_start REAL NOT NULL,
                    x_end REAL NOT NULL,
                    y_end REAL NOT NULL,
                    color TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS processes (
                    id INTEGER PRIMARY KEY,
                    environment_id INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS process_steps (
                    process_id INTEGER NOT NULL,
                    step_number INTEGER NOT NULL CHECK (step_number >= 1),
                    name TEXT NOT NULL,
                    target_zone_id INTEGER NOT NULL,
                    duration_secs INTEGER NOT NULL CHECK (duration_secs > 0),
                    description TEXT,
                    PRIMARY KEY (process_id, step_number),
                    FOREIGN KEY (process_id) REFERENCES processes(id) ON DELETE CASCADE,
                    FOREIGN KEY (target_zone_id) REFERENCES zones(id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_zones_environment
                    ON zones(environment_id, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
