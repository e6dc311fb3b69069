//! Boundary to the external speech-synthesis engine.

use std::fmt;

use drill_core::playback::{SpeechOutcome, Utterance};
use tokio::sync::oneshot;

use crate::error::SpeechError;

/// Identifies one accepted speak request within a speech backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeechHandle(u64);

impl SpeechHandle {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpeechHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "speech#{}", self.0)
    }
}

/// An accepted request: its handle plus the single notification of how it ended.
#[derive(Debug)]
pub struct SpeechTicket {
    pub handle: SpeechHandle,
    pub finished: oneshot::Receiver<SpeechOutcome>,
}

impl SpeechTicket {
    /// Creates a ticket and the completer the backend uses to resolve it.
    #[must_use]
    pub fn channel(handle: SpeechHandle) -> (SpeechCompleter, Self) {
        let (tx, rx) = oneshot::channel();
        (
            SpeechCompleter { tx },
            Self {
                handle,
                finished: rx,
            },
        )
    }
}

/// Backend side of a ticket. Consumed on use, so each request resolves at most once.
#[derive(Debug)]
pub struct SpeechCompleter {
    tx: oneshot::Sender<SpeechOutcome>,
}

impl SpeechCompleter {
    /// Reports that the utterance finished playing.
    ///
    /// Returns `false` if nobody is listening any more (the request was cancelled).
    pub fn complete(self) -> bool {
        self.tx.send(SpeechOutcome::Completed).is_ok()
    }

    /// Reports that the utterance could not be played.
    pub fn fail(self, reason: impl Into<String>) -> bool {
        self.tx
            .send(SpeechOutcome::Failed {
                reason: reason.into(),
            })
            .is_ok()
    }
}

/// Capability the player needs from a speech engine.
///
/// `request_speech` must not block; the outcome is delivered later through the
/// ticket. `cancel` is best-effort: a backend that cannot interrupt may still
/// resolve the ticket, and the player ignores it.
pub trait SpeechService: Send + Sync {
    /// Queue an utterance for playback.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` if the engine refuses the request outright.
    fn request_speech(&self, utterance: &Utterance) -> Result<SpeechTicket, SpeechError>;

    fn cancel(&self, handle: SpeechHandle);
}
