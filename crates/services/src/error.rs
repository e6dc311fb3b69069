//! Shared error types for the services crate.

use thiserror::Error;

use drill_core::model::{WordError, WordId};
use drill_core::playback::PlaybackError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `WordService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WordServiceError {
    #[error("word {0} not found")]
    NotFound(WordId),
    #[error(transparent)]
    Word(#[from] WordError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StatsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the playback player.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlayerError {
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("player has shut down")]
    Closed,
}

impl PlayerError {
    /// True when `start` found no selected words.
    #[must_use]
    pub fn is_nothing_to_play(&self) -> bool {
        matches!(self, PlayerError::Playback(PlaybackError::EmptyPlaylist))
    }
}

/// Errors emitted by speech backends when a request cannot be accepted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpeechError {
    #[error("speech engine unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
