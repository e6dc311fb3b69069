//! Drives the playback sequencer against a speech backend.

mod handle;
mod task;

use std::sync::Arc;

use drill_core::model::PlaybackSettings;
use drill_core::playback::Sequencer;
use storage::repository::{PlayLogRepository, WordRepository};
use tokio::sync::{mpsc, watch};

use crate::Clock;
use crate::speech::SpeechService;

pub use handle::PlayerHandle;

use task::PlayerTask;

const COMMAND_BUFFER: usize = 32;

/// Builds player sessions from the shared repositories and speech backend.
#[derive(Clone)]
pub struct PlayerService {
    clock: Clock,
    settings: PlaybackSettings,
    words: Arc<dyn WordRepository>,
    play_log: Arc<dyn PlayLogRepository>,
    speech: Arc<dyn SpeechService>,
}

impl PlayerService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: PlaybackSettings,
        words: Arc<dyn WordRepository>,
        play_log: Arc<dyn PlayLogRepository>,
        speech: Arc<dyn SpeechService>,
    ) -> Self {
        Self {
            clock,
            settings,
            words,
            play_log,
            speech,
        }
    }

    /// Spawns an idle player session on the current tokio runtime.
    ///
    /// The session ends when `PlayerHandle::shutdown` is called or every handle
    /// has been dropped.
    #[must_use]
    pub fn spawn(&self) -> PlayerHandle {
        let sequencer = Sequencer::new(self.settings.clone());
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots_tx, snapshots_rx) = watch::channel(sequencer.snapshot());

        let task = PlayerTask::new(
            sequencer,
            self.clock,
            Arc::clone(&self.words),
            Arc::clone(&self.play_log),
            Arc::clone(&self.speech),
            commands_rx,
            snapshots_tx,
        );
        tokio::spawn(task.run());

        PlayerHandle::new(commands_tx, snapshots_rx)
    }
}
