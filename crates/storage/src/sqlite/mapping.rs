use drill_core::model::{PlayLogEntry, Word, WordId};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn word_id_to_i64(id: WordId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("word_id overflow".into()))
}

pub(crate) fn word_id_from_i64(v: i64) -> Result<WordId, StorageError> {
    u64::try_from(v)
        .map(WordId::new)
        .map_err(|_| StorageError::Serialization("word_id sign overflow".into()))
}

pub(crate) fn count_from_i64(v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid count: {v}")))
}

pub(crate) fn map_word_row(row: &sqlx::sqlite::SqliteRow) -> Result<Word, StorageError> {
    let id = word_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let included = row.try_get::<i64, _>("included").map_err(ser)? != 0;

    Word::from_persisted(
        id,
        row.try_get::<String, _>("text_primary").map_err(ser)?,
        row.try_get::<String, _>("text_secondary").map_err(ser)?,
        included,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_play_log_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<PlayLogEntry, StorageError> {
    let date = row.try_get("day").map_err(ser)?;
    let count = count_from_i64(row.try_get::<i64, _>("count").map_err(ser)?)?;
    Ok(PlayLogEntry::new(date, count))
}
