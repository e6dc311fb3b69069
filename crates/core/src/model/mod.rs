mod ids;
mod language;
mod play_log;
mod settings;
mod word;

pub use ids::{ParseIdError, WordId};
pub use language::Language;
pub use play_log::{PlayHistory, PlayLogEntry, STATS_WINDOW_DAYS, fill_window, window_start};
pub use settings::{
    DEFAULT_PRIMARY_TAG, DEFAULT_SECONDARY_TAG, DEFAULT_SPEECH_RATE, INTER_UTTERANCE_DELAY,
    PlaybackSettings, REQUIRED_REPEATS, SettingsError,
};
pub use word::{Word, WordError};
