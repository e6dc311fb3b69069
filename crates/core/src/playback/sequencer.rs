use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::model::{Language, PlaybackSettings, Word, WordId};
use super::playlist::Playlist;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlaybackError {
    #[error("nothing to play: no words are selected")]
    EmptyPlaylist,
}

//
// ─── TYPES ─────────────────────────────────────────────────────────────────────
//

/// Monotonic tag attached to every speak request and settling timer.
///
/// Only events carrying the sequencer's current generation are acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Generation(u64);

impl Generation {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    SpeakingPrimary,
    SpeakingSecondary,
}

/// One request for the speech engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Utterance {
    pub text: String,
    pub language: Language,
    pub language_tag: String,
    pub rate: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakRequest {
    pub generation: Generation,
    pub word_id: WordId,
    pub position: usize,
    pub utterance: Utterance,
}

/// How an utterance ended. Both variants advance the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    Completed,
    Failed { reason: String },
}

/// Side effects requested by the sequencer, to be carried out in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Speak(SpeakRequest),
    /// Cancel whatever utterance is in flight.
    CancelSpeech,
    /// Drop any armed settling timer.
    CancelTimer,
    /// Arm the single-shot settling timer; report back through `on_delay_elapsed`.
    ScheduleSpeak { generation: Generation, delay: Duration },
    /// A word finished its full cycle.
    RecordCycle { word_id: WordId },
}

/// Result of feeding a speech completion into the sequencer.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Advanced(Vec<Action>),
    /// The completion belonged to a cancelled or superseded request.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Awaiting {
    Nothing,
    Speech(Generation),
    Delay(Generation),
}

/// Read-only view of the session, published after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub position: usize,
    pub playlist_len: usize,
    pub active_language: Language,
    pub repeats_completed: u32,
    pub required_repeats: u32,
    pub current_word: Option<Word>,
    pub generation: Generation,
    /// True while waiting out the pause between two utterances.
    pub settling: bool,
}

impl PlaybackSnapshot {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state != PlaybackState::Idle
    }

    /// Text of the side currently being (or about to be) spoken.
    #[must_use]
    pub fn current_text(&self) -> Option<&str> {
        self.current_word
            .as_ref()
            .map(|w| w.text(self.active_language))
    }

    /// 1-based repeat indicator, e.g. `REPEAT 1/2`.
    #[must_use]
    pub fn repeat_label(&self) -> String {
        format!(
            "REPEAT {}/{}",
            self.repeats_completed + 1,
            self.required_repeats
        )
    }
}

//
// ─── SEQUENCER ─────────────────────────────────────────────────────────────────
//

/// Listen-and-repeat state machine.
///
/// Each word is spoken primary, secondary, primary, secondary (for the default
/// two repeats) before the position advances, looping over the playlist forever.
/// The sequencer performs no IO: every method returns the actions the caller
/// must carry out.
#[derive(Debug, Clone)]
pub struct Sequencer {
    settings: PlaybackSettings,
    playlist: Playlist,
    position: usize,
    active_language: Language,
    repeats_completed: u32,
    running: bool,
    generation: Generation,
    awaiting: Awaiting,
}

impl Sequencer {
    #[must_use]
    pub fn new(settings: PlaybackSettings) -> Self {
        Self {
            settings,
            playlist: Playlist::empty(),
            position: 0,
            active_language: Language::Primary,
            repeats_completed: 0,
            running: false,
            generation: Generation::default(),
            awaiting: Awaiting::Nothing,
        }
    }

    #[must_use]
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn active_language(&self) -> Language {
        self.active_language
    }

    #[must_use]
    pub fn repeats_completed(&self) -> u32 {
        self.repeats_completed
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        match (self.running, self.active_language) {
            (false, _) => PlaybackState::Idle,
            (true, Language::Primary) => PlaybackState::SpeakingPrimary,
            (true, Language::Secondary) => PlaybackState::SpeakingSecondary,
        }
    }

    #[must_use]
    pub fn current_word(&self) -> Option<&Word> {
        self.playlist.get(self.position)
    }

    #[must_use]
    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state(),
            position: self.position,
            playlist_len: self.playlist.len(),
            active_language: self.active_language,
            repeats_completed: self.repeats_completed,
            required_repeats: self.settings.required_repeats(),
            current_word: self.current_word().cloned(),
            generation: self.generation,
            settling: matches!(self.awaiting, Awaiting::Delay(_)),
        }
    }

    /// Installs a playlist snapshot while idle.
    ///
    /// A playlist with a different identity resets the session to
    /// `(0, Primary, 0)`. The same identity keeps the position and only picks up
    /// text edits. Ignored while running: a new selection needs a restart.
    ///
    /// Returns `true` if the playlist was installed.
    pub fn load_playlist(&mut self, playlist: Playlist) -> bool {
        if self.running {
            return false;
        }
        if !self.playlist.same_identity(&playlist) {
            self.position = 0;
            self.reset_cycle();
        }
        self.playlist = playlist;
        if self.position >= self.playlist.len() {
            self.position = 0;
        }
        true
    }

    /// Starts (or resumes) playback with a fresh playlist snapshot.
    ///
    /// Resuming restarts the current word's cycle from its primary side.
    /// Starting while already running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::EmptyPlaylist` if no words are selected; the
    /// sequencer stays idle.
    pub fn start(&mut self, playlist: Playlist) -> Result<Vec<Action>, PlaybackError> {
        if self.running {
            return Ok(Vec::new());
        }
        self.load_playlist(playlist);
        if self.playlist.is_empty() {
            return Err(PlaybackError::EmptyPlaylist);
        }

        self.reset_cycle();
        self.running = true;
        Ok(self.issue_speak().into_iter().collect())
    }

    /// Stops playback, cancelling the in-flight utterance and any pending timer.
    pub fn pause(&mut self) -> Vec<Action> {
        if !self.running {
            return Vec::new();
        }
        self.running = false;
        self.invalidate();
        vec![Action::CancelTimer, Action::CancelSpeech]
    }

    pub fn next(&mut self) -> Vec<Action> {
        self.navigate(Step::Forward)
    }

    pub fn prev(&mut self) -> Vec<Action> {
        self.navigate(Step::Back)
    }

    /// Feeds the end of an utterance into the state machine.
    ///
    /// Failures sequence exactly like completions so one unsupported voice
    /// cannot stall the session.
    pub fn on_speech_finished(
        &mut self,
        generation: Generation,
        _outcome: &SpeechOutcome,
    ) -> Completion {
        if !self.running || self.awaiting != Awaiting::Speech(generation) {
            return Completion::Stale;
        }

        let mut actions = Vec::with_capacity(2);
        match self.active_language {
            Language::Primary => {
                self.active_language = Language::Secondary;
            }
            Language::Secondary => {
                self.active_language = Language::Primary;
                self.repeats_completed += 1;
                if self.repeats_completed >= self.settings.required_repeats() {
                    self.repeats_completed = 0;
                    if let Some(word) = self.current_word() {
                        actions.push(Action::RecordCycle { word_id: word.id() });
                    }
                    self.position = (self.position + 1) % self.playlist.len();
                }
            }
        }

        self.awaiting = Awaiting::Delay(generation);
        actions.push(Action::ScheduleSpeak {
            generation,
            delay: self.settings.inter_utterance_delay(),
        });
        Completion::Advanced(actions)
    }

    /// Called when the settling timer armed by `ScheduleSpeak` fires.
    ///
    /// Stale timers yield no actions.
    pub fn on_delay_elapsed(&mut self, generation: Generation) -> Vec<Action> {
        if !self.running || self.awaiting != Awaiting::Delay(generation) {
            return Vec::new();
        }
        self.issue_speak().into_iter().collect()
    }

    fn navigate(&mut self, step: Step) -> Vec<Action> {
        let len = self.playlist.len();
        if len == 0 {
            return Vec::new();
        }

        self.position = match step {
            Step::Forward => (self.position + 1) % len,
            Step::Back => (self.position + len - 1) % len,
        };
        self.reset_cycle();

        if !self.running {
            return Vec::new();
        }
        self.invalidate();
        let mut actions = vec![Action::CancelTimer, Action::CancelSpeech];
        actions.extend(self.issue_speak());
        actions
    }

    fn issue_speak(&mut self) -> Option<Action> {
        let word = self.playlist.get(self.position)?;
        let language = self.active_language;
        let utterance = Utterance {
            text: word.text(language).to_owned(),
            language,
            language_tag: self.settings.language_tag(language).to_owned(),
            rate: self.settings.speech_rate(),
        };
        let word_id = word.id();

        self.generation = self.generation.next();
        self.awaiting = Awaiting::Speech(self.generation);
        Some(Action::Speak(SpeakRequest {
            generation: self.generation,
            word_id,
            position: self.position,
            utterance,
        }))
    }

    fn invalidate(&mut self) {
        self.generation = self.generation.next();
        self.awaiting = Awaiting::Nothing;
    }

    fn reset_cycle(&mut self) {
        self.active_language = Language::Primary;
        self.repeats_completed = 0;
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Forward,
    Back,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn word(id: u64, primary: &str, secondary: &str) -> Word {
        Word::new(WordId::new(id), primary, secondary, fixed_now()).unwrap()
    }

    fn playlist_ab() -> Playlist {
        Playlist::from_words(vec![word(1, "A", "A'"), word(2, "B", "B'")])
    }

    fn speak_of(actions: &[Action]) -> &SpeakRequest {
        actions
            .iter()
            .find_map(|a| match a {
                Action::Speak(req) => Some(req),
                _ => None,
            })
            .expect("speak action")
    }

    fn records(actions: &[Action]) -> usize {
        actions
            .iter()
            .filter(|a| matches!(a, Action::RecordCycle { .. }))
            .count()
    }

    /// Completes the in-flight utterance and lets the settling timer fire.
    fn finish(seq: &mut Sequencer) -> (Vec<Action>, Vec<Action>) {
        let generation = seq.generation();
        let Completion::Advanced(on_complete) =
            seq.on_speech_finished(generation, &SpeechOutcome::Completed)
        else {
            panic!("completion should be current");
        };
        let after_delay = seq.on_delay_elapsed(generation);
        (on_complete, after_delay)
    }

    #[test]
    fn start_speaks_first_primary_text() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        let actions = seq.start(playlist_ab()).unwrap();

        assert_eq!(actions.len(), 1);
        let req = speak_of(&actions);
        assert_eq!(req.utterance.text, "A");
        assert_eq!(req.utterance.language_tag, "vi-VN");
        assert_eq!(req.position, 0);
        assert_eq!(seq.state(), PlaybackState::SpeakingPrimary);
    }

    #[test]
    fn start_with_empty_playlist_stays_idle() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        let err = seq.start(Playlist::empty()).unwrap_err();
        assert_eq!(err, PlaybackError::EmptyPlaylist);
        assert_eq!(seq.state(), PlaybackState::Idle);
    }

    #[test]
    fn start_while_running_is_noop() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        seq.start(playlist_ab()).unwrap();
        let generation = seq.generation();
        assert!(seq.start(playlist_ab()).unwrap().is_empty());
        assert_eq!(seq.generation(), generation);
    }

    #[test]
    fn each_word_is_spoken_four_times_before_advancing() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        let first = seq.start(playlist_ab()).unwrap();
        let mut spoken = vec![speak_of(&first).utterance.text.clone()];

        let mut recorded = 0;
        for _ in 0..4 {
            let (on_complete, after_delay) = finish(&mut seq);
            recorded += records(&on_complete);
            spoken.push(speak_of(&after_delay).utterance.text.clone());
        }

        assert_eq!(spoken, vec!["A", "A'", "A", "A'", "B"]);
        assert_eq!(recorded, 1);
        assert_eq!(seq.position(), 1);
        assert_eq!(seq.repeats_completed(), 0);
    }

    #[test]
    fn repeats_counter_cycles_once_per_word() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        seq.start(playlist_ab()).unwrap();

        let mut observed = vec![seq.repeats_completed()];
        for _ in 0..4 {
            finish(&mut seq);
            observed.push(seq.repeats_completed());
        }
        assert_eq!(observed, vec![0, 0, 1, 1, 0]);
    }

    #[test]
    fn completion_schedules_delay_before_next_speak() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        seq.start(playlist_ab()).unwrap();

        let generation = seq.generation();
        let Completion::Advanced(actions) =
            seq.on_speech_finished(generation, &SpeechOutcome::Completed)
        else {
            panic!("expected advance");
        };
        assert_eq!(
            actions,
            vec![Action::ScheduleSpeak {
                generation,
                delay: Duration::from_millis(800),
            }]
        );
        assert!(seq.snapshot().settling);
        assert_eq!(seq.state(), PlaybackState::SpeakingSecondary);
    }

    #[test]
    fn failed_speech_advances_like_completion() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        seq.start(playlist_ab()).unwrap();

        let outcome = SpeechOutcome::Failed {
            reason: "voice unavailable".into(),
        };
        let completion = seq.on_speech_finished(seq.generation(), &outcome);
        assert!(matches!(completion, Completion::Advanced(_)));
        assert_eq!(seq.active_language(), Language::Secondary);
    }

    #[test]
    fn position_wraps_after_last_word() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        seq.start(playlist_ab()).unwrap();
        seq.next();
        assert_eq!(seq.position(), 1);

        for _ in 0..3 {
            finish(&mut seq);
        }
        let (on_complete, after_delay) = finish(&mut seq);
        assert_eq!(records(&on_complete), 1);
        assert_eq!(seq.position(), 0);
        assert_eq!(speak_of(&after_delay).utterance.text, "A");
    }

    #[test]
    fn navigation_resets_cycle_and_respeaks_while_running() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        seq.start(playlist_ab()).unwrap();
        finish(&mut seq);
        finish(&mut seq);
        finish(&mut seq);
        assert_eq!(seq.repeats_completed(), 1);
        assert_eq!(seq.active_language(), Language::Secondary);

        let actions = seq.prev();
        assert_eq!(actions[0], Action::CancelTimer);
        assert_eq!(actions[1], Action::CancelSpeech);
        assert_eq!(speak_of(&actions).utterance.text, "B");
        assert_eq!(seq.position(), 1);
        assert_eq!(seq.active_language(), Language::Primary);
        assert_eq!(seq.repeats_completed(), 0);
    }

    #[test]
    fn navigation_while_idle_moves_without_speaking() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        assert!(seq.load_playlist(playlist_ab()));

        assert!(seq.next().is_empty());
        assert_eq!(seq.position(), 1);
        assert!(seq.next().is_empty());
        assert_eq!(seq.position(), 0);
        assert!(seq.prev().is_empty());
        assert_eq!(seq.position(), 1);
        assert_eq!(seq.state(), PlaybackState::Idle);
    }

    #[test]
    fn navigation_on_empty_playlist_is_noop() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        assert!(seq.next().is_empty());
        assert!(seq.prev().is_empty());
        assert_eq!(seq.position(), 0);
    }

    #[test]
    fn stale_completion_after_pause_is_discarded() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        seq.start(playlist_ab()).unwrap();
        let before_pause = seq.generation();

        let actions = seq.pause();
        assert_eq!(actions, vec![Action::CancelTimer, Action::CancelSpeech]);

        let completion = seq.on_speech_finished(before_pause, &SpeechOutcome::Completed);
        assert_eq!(completion, Completion::Stale);
        assert_eq!(seq.state(), PlaybackState::Idle);
        assert_eq!(seq.position(), 0);
        assert_eq!(seq.active_language(), Language::Primary);
    }

    #[test]
    fn stale_timer_after_navigation_is_discarded() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        seq.start(playlist_ab()).unwrap();
        let generation = seq.generation();
        let _ = seq.on_speech_finished(generation, &SpeechOutcome::Completed);

        seq.next();
        assert!(seq.on_delay_elapsed(generation).is_empty());
        assert_eq!(seq.position(), 1);
        assert_eq!(seq.active_language(), Language::Primary);
    }

    #[test]
    fn completion_of_superseded_request_is_stale_while_running() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        seq.start(playlist_ab()).unwrap();
        let old = seq.generation();
        seq.next();

        assert_eq!(
            seq.on_speech_finished(old, &SpeechOutcome::Completed),
            Completion::Stale
        );
        assert!(seq.generation() > old);
    }

    #[test]
    fn resume_keeps_position_and_restarts_word_cycle() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        seq.start(playlist_ab()).unwrap();
        seq.next();
        finish(&mut seq);
        seq.pause();

        let actions = seq.start(playlist_ab()).unwrap();
        assert_eq!(seq.position(), 1);
        assert_eq!(speak_of(&actions).utterance.text, "B");
        assert_eq!(seq.repeats_completed(), 0);
    }

    #[test]
    fn new_playlist_identity_resets_position() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        seq.start(playlist_ab()).unwrap();
        seq.next();
        seq.pause();

        let other = Playlist::from_words(vec![word(3, "C", "C'"), word(2, "B", "B'")]);
        let actions = seq.start(other).unwrap();
        assert_eq!(seq.position(), 0);
        assert_eq!(speak_of(&actions).utterance.text, "C");
    }

    #[test]
    fn playlist_is_not_replaced_while_running() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        seq.start(playlist_ab()).unwrap();
        assert!(!seq.load_playlist(Playlist::empty()));
        assert_eq!(seq.playlist().len(), 2);
    }

    #[test]
    fn custom_repeat_count_is_honored() {
        let settings = PlaybackSettings::default()
            .with_required_repeats(1)
            .unwrap();
        let mut seq = Sequencer::new(settings);
        seq.start(playlist_ab()).unwrap();

        finish(&mut seq);
        let (on_complete, after_delay) = finish(&mut seq);
        assert_eq!(records(&on_complete), 1);
        assert_eq!(speak_of(&after_delay).utterance.text, "B");
    }

    #[test]
    fn snapshot_reports_current_word_and_label() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        seq.start(playlist_ab()).unwrap();
        finish(&mut seq);
        finish(&mut seq);

        let snapshot = seq.snapshot();
        assert!(snapshot.is_running());
        assert_eq!(snapshot.current_text(), Some("A"));
        assert_eq!(snapshot.repeat_label(), "REPEAT 2/2");
        assert_eq!(snapshot.playlist_len, 2);
        assert!(!snapshot.settling);
    }

    #[test]
    fn scenario_two_words_with_wrap_on_next() {
        let mut seq = Sequencer::new(PlaybackSettings::default());
        let mut history = crate::model::PlayHistory::new();
        let today = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let first = seq.start(playlist_ab()).unwrap();
        assert_eq!(speak_of(&first).utterance.text, "A");

        let mut last = Vec::new();
        for _ in 0..4 {
            let (on_complete, after_delay) = finish(&mut seq);
            for _ in 0..records(&on_complete) {
                history.record_cycle(today);
            }
            last = after_delay;
        }
        assert_eq!(history.total(), 1);
        assert_eq!(seq.position(), 1);
        assert_eq!(speak_of(&last).utterance.text, "B");

        let actions = seq.next();
        assert!(actions.contains(&Action::CancelSpeech));
        assert_eq!(seq.position(), 0);
        assert_eq!(seq.repeats_completed(), 0);
        assert_eq!(seq.active_language(), Language::Primary);
        assert_eq!(speak_of(&actions).utterance.text, "A");
    }
}
