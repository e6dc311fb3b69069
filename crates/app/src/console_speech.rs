use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use drill_core::playback::Utterance;
use services::{SpeechError, SpeechHandle, SpeechService, SpeechTicket};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

const BASE_DURATION: Duration = Duration::from_millis(400);
const PER_CHAR: Duration = Duration::from_millis(90);

/// Stand-in speech engine for the terminal: prints each utterance and reports
/// it finished after roughly the time it would take to say it.
#[derive(Default)]
pub struct ConsoleSpeech {
    next_handle: AtomicU64,
    active: Arc<Mutex<HashMap<SpeechHandle, JoinHandle<()>>>>,
}

impl ConsoleSpeech {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Simulated speaking time; longer text takes longer, a higher rate is faster.
pub fn utterance_duration(utterance: &Utterance) -> Duration {
    let chars = u32::try_from(utterance.text.chars().count()).unwrap_or(u32::MAX);
    let spoken = BASE_DURATION + PER_CHAR.saturating_mul(chars);
    Duration::from_secs_f64(spoken.as_secs_f64() / f64::from(utterance.rate.max(0.1)))
}

impl SpeechService for ConsoleSpeech {
    fn request_speech(&self, utterance: &Utterance) -> Result<SpeechTicket, SpeechError> {
        let runtime = Handle::try_current().map_err(|e| SpeechError::Unavailable(e.to_string()))?;
        let handle = SpeechHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1);
        let (completer, ticket) = SpeechTicket::channel(handle);
        let duration = utterance_duration(utterance);

        println!("  [{}] {}", utterance.language_tag, utterance.text);

        let mut active = self
            .active
            .lock()
            .map_err(|e| SpeechError::Unavailable(e.to_string()))?;
        let registry = Arc::clone(&self.active);
        let task = runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if let Ok(mut active) = registry.lock() {
                active.remove(&handle);
            }
            completer.complete();
        });
        active.insert(handle, task);
        Ok(ticket)
    }

    fn cancel(&self, handle: SpeechHandle) {
        let task = self
            .active
            .lock()
            .ok()
            .and_then(|mut active| active.remove(&handle));
        if let Some(task) = task {
            debug!(%handle, "speech interrupted");
            task.abort();
        }
    }
}
