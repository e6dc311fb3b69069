use drill_core::playback::PlaybackSnapshot;
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::PlayerError;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, PlayerError>>;

/// Commands accepted by the player task.
#[derive(Debug)]
pub(crate) enum PlayerCommand {
    Start(Reply<()>),
    Pause(Reply<()>),
    Toggle(Reply<bool>),
    Next(Reply<()>),
    Prev(Reply<()>),
    RefreshPlaylist(Reply<bool>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable front end to a running player session.
///
/// Every command resolves after the player has applied it, so a caller can read
/// the snapshot immediately afterwards.
#[derive(Clone, Debug)]
pub struct PlayerHandle {
    commands: mpsc::Sender<PlayerCommand>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
}

impl PlayerHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<PlayerCommand>,
        snapshots: watch::Receiver<PlaybackSnapshot>,
    ) -> Self {
        Self {
            commands,
            snapshots,
        }
    }

    /// Start or resume playback with a fresh snapshot of the selected words.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Playback(EmptyPlaylist)` when no words are selected,
    /// `PlayerError::Storage` if the words cannot be loaded.
    pub async fn start(&self) -> Result<(), PlayerError> {
        self.request(PlayerCommand::Start).await
    }

    /// # Errors
    ///
    /// Returns `PlayerError::Closed` if the player has shut down.
    pub async fn pause(&self) -> Result<(), PlayerError> {
        self.request(PlayerCommand::Pause).await
    }

    /// Pause when running, start otherwise. Returns whether playback is now running.
    ///
    /// # Errors
    ///
    /// Same as `start`.
    pub async fn toggle(&self) -> Result<bool, PlayerError> {
        self.request(PlayerCommand::Toggle).await
    }

    /// # Errors
    ///
    /// Returns `PlayerError::Closed` if the player has shut down.
    pub async fn next(&self) -> Result<(), PlayerError> {
        self.request(PlayerCommand::Next).await
    }

    /// # Errors
    ///
    /// Returns `PlayerError::Closed` if the player has shut down.
    pub async fn prev(&self) -> Result<(), PlayerError> {
        self.request(PlayerCommand::Prev).await
    }

    /// Reload the selected words while idle so navigation and the snapshot see them.
    /// Returns `false` if playback is running (the playlist is kept until restart).
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Storage` if the words cannot be loaded.
    pub async fn refresh_playlist(&self) -> Result<bool, PlayerError> {
        self.request(PlayerCommand::RefreshPlaylist).await
    }

    /// Stop playback and end the session task. Further commands return `Closed`.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(PlayerCommand::Shutdown(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Latest published state.
    #[must_use]
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> PlayerCommand,
    ) -> Result<T, PlayerError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| PlayerError::Closed)?;
        rx.await.map_err(|_| PlayerError::Closed)?
    }
}
