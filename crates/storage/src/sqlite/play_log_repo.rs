use chrono::NaiveDate;
use drill_core::model::PlayLogEntry;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{count_from_i64, map_play_log_row, ser};
use crate::repository::{PlayLogRepository, StorageError};

#[async_trait::async_trait]
impl PlayLogRepository for SqliteRepository {
    async fn record_cycle(&self, day: NaiveDate) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
                INSERT INTO play_log (day, count)
                VALUES (?1, 1)
                ON CONFLICT(day) DO UPDATE SET count = count + 1
                RETURNING count
            ",
        )
        .bind(day)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        count_from_i64(row.try_get::<i64, _>("count").map_err(ser)?)
    }

    async fn count_for_day(&self, day: NaiveDate) -> Result<u32, StorageError> {
        let row = sqlx::query("SELECT count FROM play_log WHERE day = ?1")
            .bind(day)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => count_from_i64(row.try_get::<i64, _>("count").map_err(ser)?),
            None => Ok(0),
        }
    }

    async fn entries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PlayLogEntry>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT day, count
                FROM play_log
                WHERE day >= ?1 AND day <= ?2
                ORDER BY day ASC
            ",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_play_log_row).collect()
    }
}
