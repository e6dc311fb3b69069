use std::sync::Arc;

use drill_core::model::PlaybackSettings;
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::player::PlayerService;
use crate::speech::SpeechService;
use crate::stats_service::StatsService;
use crate::word_service::WordService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    words: Arc<WordService>,
    stats: Arc<StatsService>,
    player: Arc<PlayerService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: PlaybackSettings,
        speech: Arc<dyn SpeechService>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, settings, speech))
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        settings: PlaybackSettings,
        speech: Arc<dyn SpeechService>,
    ) -> Self {
        let words = Arc::new(WordService::new(clock, Arc::clone(&storage.words)));
        let stats = Arc::new(StatsService::new(clock, Arc::clone(&storage.play_log)));
        let player = Arc::new(PlayerService::new(
            clock,
            settings,
            Arc::clone(&storage.words),
            Arc::clone(&storage.play_log),
            speech,
        ));
        Self {
            words,
            stats,
            player,
        }
    }

    #[must_use]
    pub fn words(&self) -> Arc<WordService> {
        Arc::clone(&self.words)
    }

    #[must_use]
    pub fn stats(&self) -> Arc<StatsService> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn player(&self) -> Arc<PlayerService> {
        Arc::clone(&self.player)
    }
}
