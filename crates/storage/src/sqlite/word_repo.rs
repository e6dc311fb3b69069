use drill_core::model::{Word, WordId};

use super::SqliteRepository;
use super::mapping::{map_word_row, word_id_from_i64, word_id_to_i64};
use crate::repository::{NewWordRecord, StorageError, WordRepository};

const WORD_COLUMNS: &str = "id, text_primary, text_secondary, included, created_at";

#[async_trait::async_trait]
impl WordRepository for SqliteRepository {
    async fn insert_new_word(&self, word: NewWordRecord) -> Result<WordId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO words (text_primary, text_secondary, included, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(word.text_primary)
        .bind(word.text_secondary)
        .bind(i64::from(word.included))
        .bind(word.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        word_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_word(&self, word: &Word) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO words (id, text_primary, text_secondary, included, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                -- created_at is fixed at first insert
                text_primary = excluded.text_primary,
                text_secondary = excluded.text_secondary,
                included = excluded.included
            ",
        )
        .bind(word_id_to_i64(word.id())?)
        .bind(word.text_primary().to_owned())
        .bind(word.text_secondary().to_owned())
        .bind(i64::from(word.included()))
        .bind(word.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError> {
        let sql = format!("SELECT {WORD_COLUMNS} FROM words WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(word_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_word_row).transpose()
    }

    async fn list_words(&self) -> Result<Vec<Word>, StorageError> {
        let sql = format!("SELECT {WORD_COLUMNS} FROM words ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_word_row).collect()
    }

    async fn list_included_words(&self) -> Result<Vec<Word>, StorageError> {
        let sql = format!(
            "SELECT {WORD_COLUMNS} FROM words WHERE included = 1 ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_word_row).collect()
    }

    async fn delete_word(&self, id: WordId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM words WHERE id = ?1")
            .bind(word_id_to_i64(id)?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
