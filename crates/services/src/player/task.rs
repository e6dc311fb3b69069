use std::future;
use std::pin::Pin;
use std::sync::Arc;

use drill_core::model::WordId;
use drill_core::playback::{
    Action, Completion, Generation, PlaybackSnapshot, Playlist, SpeakRequest, Sequencer,
    SpeechOutcome,
};
use storage::repository::{PlayLogRepository, WordRepository};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Sleep};
use tracing::{debug, error, info, warn};

use super::handle::{PlayerCommand, Reply};
use crate::Clock;
use crate::error::PlayerError;
use crate::speech::{SpeechHandle, SpeechService};

/// The utterance currently awaited.
struct InFlight {
    generation: Generation,
    handle: Option<SpeechHandle>,
    finished: oneshot::Receiver<SpeechOutcome>,
}

/// Armed settling timer.
struct Settling {
    generation: Generation,
    sleep: Pin<Box<Sleep>>,
}

/// Single task owning all session state. Commands, speech completions and the
/// settling timer are handled one at a time, so no locking is needed.
pub(crate) struct PlayerTask {
    sequencer: Sequencer,
    clock: Clock,
    words: Arc<dyn WordRepository>,
    play_log: Arc<dyn PlayLogRepository>,
    speech: Arc<dyn SpeechService>,
    commands: mpsc::Receiver<PlayerCommand>,
    snapshots: watch::Sender<PlaybackSnapshot>,
    in_flight: Option<InFlight>,
    timer: Option<Settling>,
}

impl PlayerTask {
    pub(crate) fn new(
        sequencer: Sequencer,
        clock: Clock,
        words: Arc<dyn WordRepository>,
        play_log: Arc<dyn PlayLogRepository>,
        speech: Arc<dyn SpeechService>,
        commands: mpsc::Receiver<PlayerCommand>,
        snapshots: watch::Sender<PlaybackSnapshot>,
    ) -> Self {
        Self {
            sequencer,
            clock,
            words,
            play_log,
            speech,
            commands,
            snapshots,
            in_flight: None,
            timer: None,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut shutdown_ack = None;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(PlayerCommand::Shutdown(ack)) => {
                        shutdown_ack = Some(ack);
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                (generation, outcome) = speech_finished(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.on_speech_finished(generation, outcome).await;
                }
                generation = settled(&mut self.timer) => {
                    self.timer = None;
                    let actions = self.sequencer.on_delay_elapsed(generation);
                    self.apply(actions).await;
                }
            }
            self.publish();
        }

        let actions = self.sequencer.pause();
        self.apply(actions).await;
        self.publish();
        info!("playback session closed");
        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }
    }

    async fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::Start(reply) => {
                let result = self.start().await;
                self.respond(reply, result);
            }
            PlayerCommand::Pause(reply) => {
                self.pause().await;
                self.respond(reply, Ok(()));
            }
            PlayerCommand::Toggle(reply) => {
                let result = if self.sequencer.is_running() {
                    self.pause().await;
                    Ok(false)
                } else {
                    self.start().await.map(|()| true)
                };
                self.respond(reply, result);
            }
            PlayerCommand::Next(reply) => {
                let actions = self.sequencer.next();
                self.apply(actions).await;
                debug!(position = self.sequencer.position(), "moved to next word");
                self.respond(reply, Ok(()));
            }
            PlayerCommand::Prev(reply) => {
                let actions = self.sequencer.prev();
                self.apply(actions).await;
                debug!(position = self.sequencer.position(), "moved to previous word");
                self.respond(reply, Ok(()));
            }
            PlayerCommand::RefreshPlaylist(reply) => {
                let result = self.refresh_playlist().await;
                self.respond(reply, result);
            }
            PlayerCommand::Shutdown(_) => {}
        }
    }

    /// Publishes first so the caller sees the applied state once the reply lands.
    fn respond<T>(&self, reply: Reply<T>, result: Result<T, PlayerError>) {
        self.publish();
        let _ = reply.send(result);
    }

    async fn start(&mut self) -> Result<(), PlayerError> {
        if self.sequencer.is_running() {
            return Ok(());
        }

        let playlist = self.load_playlist().await?;
        let actions = match self.sequencer.start(playlist) {
            Ok(actions) => actions,
            Err(err) => {
                info!("nothing to play: no words selected");
                return Err(err.into());
            }
        };
        info!(
            position = self.sequencer.position(),
            words = self.sequencer.playlist().len(),
            "playback started"
        );
        self.apply(actions).await;
        Ok(())
    }

    async fn pause(&mut self) {
        let actions = self.sequencer.pause();
        if !actions.is_empty() {
            info!(position = self.sequencer.position(), "playback paused");
        }
        self.apply(actions).await;
    }

    async fn refresh_playlist(&mut self) -> Result<bool, PlayerError> {
        if self.sequencer.is_running() {
            return Ok(false);
        }
        let playlist = self.load_playlist().await?;
        Ok(self.sequencer.load_playlist(playlist))
    }

    async fn load_playlist(&self) -> Result<Playlist, PlayerError> {
        let words = self.words.list_included_words().await?;
        Ok(Playlist::from_words(words))
    }

    async fn on_speech_finished(&mut self, generation: Generation, outcome: SpeechOutcome) {
        if let SpeechOutcome::Failed { reason } = &outcome {
            warn!(%generation, %reason, "speech failed; continuing with the cycle");
        }
        match self.sequencer.on_speech_finished(generation, &outcome) {
            Completion::Advanced(actions) => self.apply(actions).await,
            Completion::Stale => debug!(%generation, "discarding stale speech completion"),
        }
    }

    async fn apply(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Speak(request) => self.speak(request),
                Action::CancelSpeech => {
                    if let Some(in_flight) = self.in_flight.take() {
                        if let Some(handle) = in_flight.handle {
                            debug!(%handle, "cancelling in-flight speech");
                            self.speech.cancel(handle);
                        }
                    }
                }
                Action::CancelTimer => self.timer = None,
                Action::ScheduleSpeak { generation, delay } => {
                    self.timer = Some(Settling {
                        generation,
                        sleep: Box::pin(time::sleep(delay)),
                    });
                }
                Action::RecordCycle { word_id } => self.record_cycle(word_id).await,
            }
        }
    }

    fn speak(&mut self, request: SpeakRequest) {
        debug!(
            generation = %request.generation,
            position = request.position,
            language = request.utterance.language.as_str(),
            text = %request.utterance.text,
            "speaking"
        );
        self.in_flight = Some(match self.speech.request_speech(&request.utterance) {
            Ok(ticket) => InFlight {
                generation: request.generation,
                handle: Some(ticket.handle),
                finished: ticket.finished,
            },
            Err(err) => {
                // Sequence a refused request like a failed one.
                let (tx, rx) = oneshot::channel();
                let _ = tx.send(SpeechOutcome::Failed {
                    reason: err.to_string(),
                });
                InFlight {
                    generation: request.generation,
                    handle: None,
                    finished: rx,
                }
            }
        });
    }

    async fn record_cycle(&self, word_id: WordId) {
        let today = self.clock.today();
        match self.play_log.record_cycle(today).await {
            Ok(count) => debug!(%word_id, %today, count, "cycle recorded"),
            Err(err) => error!(%word_id, %today, error = %err, "failed to record play cycle"),
        }
    }

    fn publish(&self) {
        let next = self.sequencer.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

async fn speech_finished(in_flight: &mut Option<InFlight>) -> (Generation, SpeechOutcome) {
    match in_flight {
        Some(in_flight) => {
            let outcome = (&mut in_flight.finished)
                .await
                .unwrap_or_else(|_| SpeechOutcome::Failed {
                    reason: "speech backend dropped the request".into(),
                });
            (in_flight.generation, outcome)
        }
        None => future::pending().await,
    }
}

async fn settled(timer: &mut Option<Settling>) -> Generation {
    match timer {
        Some(settling) => {
            settling.sleep.as_mut().await;
            settling.generation
        }
        None => future::pending().await,
    }
}
