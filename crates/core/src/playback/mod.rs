//! Playback sequencing for listen-and-repeat sessions.

mod playlist;
mod sequencer;

pub use playlist::Playlist;
pub use sequencer::{
    Action, Completion, Generation, PlaybackError, PlaybackSnapshot, PlaybackState, Sequencer,
    SpeakRequest, SpeechOutcome, Utterance,
};
