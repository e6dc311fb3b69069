use std::time::Duration;

use thiserror::Error;

use crate::model::language::Language;

/// Number of full primary/secondary pairs spoken before a word is considered done.
pub const REQUIRED_REPEATS: u32 = 2;

/// Pause between a finished utterance and the next speak request.
pub const INTER_UTTERANCE_DELAY: Duration = Duration::from_millis(800);

/// Speech rate handed to the synthesizer (1.0 is the engine's normal speed).
pub const DEFAULT_SPEECH_RATE: f32 = 0.9;

pub const DEFAULT_PRIMARY_TAG: &str = "vi-VN";
pub const DEFAULT_SECONDARY_TAG: &str = "ko-KR";

const MIN_SPEECH_RATE: f32 = 0.1;
const MAX_SPEECH_RATE: f32 = 10.0;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("language tag cannot be empty")]
    EmptyLanguageTag,

    #[error("speech rate must be between 0.1 and 10, got {0}")]
    InvalidSpeechRate(f32),

    #[error("required repeats must be > 0")]
    InvalidRequiredRepeats,
}

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Tunables for a playback session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    primary_tag: String,
    secondary_tag: String,
    speech_rate: f32,
    required_repeats: u32,
    inter_utterance_delay: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            primary_tag: DEFAULT_PRIMARY_TAG.to_owned(),
            secondary_tag: DEFAULT_SECONDARY_TAG.to_owned(),
            speech_rate: DEFAULT_SPEECH_RATE,
            required_repeats: REQUIRED_REPEATS,
            inter_utterance_delay: INTER_UTTERANCE_DELAY,
        }
    }
}

impl PlaybackSettings {
    /// Creates settings for the given language tags with default rate and timing.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::EmptyLanguageTag` if either tag is blank.
    pub fn new(
        primary_tag: impl Into<String>,
        secondary_tag: impl Into<String>,
    ) -> Result<Self, SettingsError> {
        let primary_tag = primary_tag.into().trim().to_owned();
        let secondary_tag = secondary_tag.into().trim().to_owned();
        if primary_tag.is_empty() || secondary_tag.is_empty() {
            return Err(SettingsError::EmptyLanguageTag);
        }
        Ok(Self {
            primary_tag,
            secondary_tag,
            ..Self::default()
        })
    }

    /// # Errors
    ///
    /// Returns `SettingsError::InvalidSpeechRate` if the rate is outside `0.1..=10.0`.
    pub fn with_speech_rate(mut self, rate: f32) -> Result<Self, SettingsError> {
        if !(MIN_SPEECH_RATE..=MAX_SPEECH_RATE).contains(&rate) {
            return Err(SettingsError::InvalidSpeechRate(rate));
        }
        self.speech_rate = rate;
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns `SettingsError::InvalidRequiredRepeats` for zero.
    pub fn with_required_repeats(mut self, repeats: u32) -> Result<Self, SettingsError> {
        if repeats == 0 {
            return Err(SettingsError::InvalidRequiredRepeats);
        }
        self.required_repeats = repeats;
        Ok(self)
    }

    #[must_use]
    pub fn with_inter_utterance_delay(mut self, delay: Duration) -> Self {
        self.inter_utterance_delay = delay;
        self
    }

    #[must_use]
    pub fn language_tag(&self, language: Language) -> &str {
        match language {
            Language::Primary => &self.primary_tag,
            Language::Secondary => &self.secondary_tag,
        }
    }

    #[must_use]
    pub fn speech_rate(&self) -> f32 {
        self.speech_rate
    }

    #[must_use]
    pub fn required_repeats(&self) -> u32 {
        self.required_repeats
    }

    #[must_use]
    pub fn inter_utterance_delay(&self) -> Duration {
        self.inter_utterance_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let settings = PlaybackSettings::default();
        assert_eq!(settings.language_tag(Language::Primary), "vi-VN");
        assert_eq!(settings.language_tag(Language::Secondary), "ko-KR");
        assert_eq!(settings.required_repeats(), REQUIRED_REPEATS);
        assert_eq!(settings.inter_utterance_delay(), Duration::from_millis(800));
        assert!((settings.speech_rate() - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_invalid_values() {
        assert_eq!(
            PlaybackSettings::new(" ", "ko-KR").unwrap_err(),
            SettingsError::EmptyLanguageTag
        );
        assert!(matches!(
            PlaybackSettings::default().with_speech_rate(0.0),
            Err(SettingsError::InvalidSpeechRate(_))
        ));
        assert_eq!(
            PlaybackSettings::default()
                .with_required_repeats(0)
                .unwrap_err(),
            SettingsError::InvalidRequiredRepeats
        );
    }

    #[test]
    fn builder_overrides_apply() {
        let settings = PlaybackSettings::new("en-US", "fr-FR")
            .unwrap()
            .with_speech_rate(1.2)
            .unwrap()
            .with_required_repeats(3)
            .unwrap()
            .with_inter_utterance_delay(Duration::ZERO);
        assert_eq!(settings.language_tag(Language::Secondary), "fr-FR");
        assert_eq!(settings.required_repeats(), 3);
        assert_eq!(settings.inter_utterance_delay(), Duration::ZERO);
    }
}
