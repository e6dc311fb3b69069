use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use drill_core::model::{PlayHistory, PlayLogEntry, Word, WordId, fill_window, window_start};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Insert shape for a word whose id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWordRecord {
    pub text_primary: String,
    pub text_secondary: String,
    pub included: bool,
    pub created_at: DateTime<Utc>,
}

impl NewWordRecord {
    #[must_use]
    pub fn from_word(word: &Word) -> Self {
        Self {
            text_primary: word.text_primary().to_owned(),
            text_secondary: word.text_secondary().to_owned(),
            included: word.included(),
            created_at: word.created_at(),
        }
    }
}

/// Repository contract for the word list.
#[async_trait]
pub trait WordRepository: Send + Sync {
    /// Insert a new word and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the word cannot be stored.
    async fn insert_new_word(&self, word: NewWordRecord) -> Result<WordId, StorageError>;

    /// Persist or update a word.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the word cannot be stored.
    async fn upsert_word(&self, word: &Word) -> Result<(), StorageError>;

    /// Fetch a word by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError>;

    /// All words in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_words(&self) -> Result<Vec<Word>, StorageError>;

    /// Words selected for playback, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_included_words(&self) -> Result<Vec<Word>, StorageError>;

    /// Remove a word.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the word does not exist.
    async fn delete_word(&self, id: WordId) -> Result<(), StorageError>;
}

/// Per-day counter of completed word cycles.
#[async_trait]
pub trait PlayLogRepository: Send + Sync {
    /// Count one completed cycle for `day`, creating the entry at 1 if absent.
    /// Returns the new count for that day.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the increment cannot be stored.
    async fn record_cycle(&self, day: NaiveDate) -> Result<u32, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn count_for_day(&self, day: NaiveDate) -> Result<u32, StorageError>;

    /// Stored entries with `from <= date <= to`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn entries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PlayLogEntry>, StorageError>;

    /// The seven days ending `today` (inclusive), oldest first, zero-filled.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn last_7_days(&self, today: NaiveDate) -> Result<Vec<PlayLogEntry>, StorageError> {
        let entries = self.entries_between(window_start(today), today).await?;
        Ok(fill_window(today, &entries))
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    words: Arc<Mutex<BTreeMap<WordId, Word>>>,
    /// Highest id ever handed out; never lowered by deletes.
    last_word_id: Arc<AtomicU64>,
    history: Arc<Mutex<PlayHistory>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_insertion<'a>(words: impl Iterator<Item = &'a Word>) -> Vec<Word> {
    let mut out: Vec<Word> = words.cloned().collect();
    out.sort_by_key(|w| (w.created_at(), w.id()));
    out
}

#[async_trait]
impl WordRepository for InMemoryRepository {
    async fn insert_new_word(&self, word: NewWordRecord) -> Result<WordId, StorageError> {
        let mut guard = self
            .words
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = WordId::new(self.last_word_id.fetch_add(1, Ordering::SeqCst) + 1);
        let stored = Word::from_persisted(
            id,
            word.text_primary,
            word.text_secondary,
            word.included,
            word.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.insert(id, stored);
        Ok(id)
    }

    async fn upsert_word(&self, word: &Word) -> Result<(), StorageError> {
        let mut guard = self
            .words
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        self.last_word_id
            .fetch_max(word.id().value(), Ordering::SeqCst);
        guard.insert(word.id(), word.clone());
        Ok(())
    }

    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError> {
        let guard = self
            .words
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_words(&self) -> Result<Vec<Word>, StorageError> {
        let guard = self
            .words
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(sorted_by_insertion(guard.values()))
    }

    async fn list_included_words(&self) -> Result<Vec<Word>, StorageError> {
        let guard = self
            .words
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(sorted_by_insertion(guard.values().filter(|w| w.included())))
    }

    async fn delete_word(&self, id: WordId) -> Result<(), StorageError> {
        let mut guard = self
            .words
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl PlayLogRepository for InMemoryRepository {
    async fn record_cycle(&self, day: NaiveDate) -> Result<u32, StorageError> {
        let mut guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.record_cycle(day))
    }

    async fn count_for_day(&self, day: NaiveDate) -> Result<u32, StorageError> {
        let guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.count_for(day))
    }

    async fn entries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PlayLogEntry>, StorageError> {
        let guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.entries_between(from, to))
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub words: Arc<dyn WordRepository>,
    pub play_log: Arc<dyn PlayLogRepository>,
}
