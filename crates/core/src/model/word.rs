use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::WordId;
use crate::model::language::Language;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WordError {
    #[error("primary text cannot be empty")]
    EmptyPrimary,

    #[error("secondary text cannot be empty")]
    EmptySecondary,
}

//
// ─── WORD ──────────────────────────────────────────────────────────────────────
//

/// A bilingual word pair.
///
/// Both texts are stored trimmed and never empty. Only words with
/// `included == true` are ever snapshotted into a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    id: WordId,
    text_primary: String,
    text_secondary: String,
    included: bool,
    created_at: DateTime<Utc>,
}

impl Word {
    /// Creates a new word pair. New words start out included.
    ///
    /// # Errors
    ///
    /// Returns `WordError` if either text is empty after trimming.
    pub fn new(
        id: WordId,
        text_primary: impl Into<String>,
        text_secondary: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, WordError> {
        let (text_primary, text_secondary) = validate_texts(text_primary, text_secondary)?;
        Ok(Self {
            id,
            text_primary,
            text_secondary,
            included: true,
            created_at,
        })
    }

    /// Rehydrates a word from storage, re-checking the text invariants.
    ///
    /// # Errors
    ///
    /// Returns `WordError` if the persisted texts are empty.
    pub fn from_persisted(
        id: WordId,
        text_primary: String,
        text_secondary: String,
        included: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, WordError> {
        let mut word = Self::new(id, text_primary, text_secondary, created_at)?;
        word.included = included;
        Ok(word)
    }

    #[must_use]
    pub fn id(&self) -> WordId {
        self.id
    }

    #[must_use]
    pub fn text_primary(&self) -> &str {
        &self.text_primary
    }

    #[must_use]
    pub fn text_secondary(&self) -> &str {
        &self.text_secondary
    }

    /// Returns the text spoken for the given language.
    #[must_use]
    pub fn text(&self, language: Language) -> &str {
        match language {
            Language::Primary => &self.text_primary,
            Language::Secondary => &self.text_secondary,
        }
    }

    #[must_use]
    pub fn included(&self) -> bool {
        self.included
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replaces both texts, keeping id, selection flag and creation time.
    ///
    /// # Errors
    ///
    /// Returns `WordError` if either text is empty after trimming. The word is
    /// left untouched on error.
    pub fn edit(
        &mut self,
        text_primary: impl Into<String>,
        text_secondary: impl Into<String>,
    ) -> Result<(), WordError> {
        let (primary, secondary) = validate_texts(text_primary, text_secondary)?;
        self.text_primary = primary;
        self.text_secondary = secondary;
        Ok(())
    }

    pub fn set_included(&mut self, included: bool) {
        self.included = included;
    }

    /// Flips the selection flag and returns the new value.
    pub fn toggle_included(&mut self) -> bool {
        self.included = !self.included;
        self.included
    }

    /// Case-insensitive substring match over both texts. An empty query matches everything.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.text_primary.to_lowercase().contains(&query)
            || self.text_secondary.to_lowercase().contains(&query)
    }
}

fn validate_texts(
    text_primary: impl Into<String>,
    text_secondary: impl Into<String>,
) -> Result<(String, String), WordError> {
    let primary = text_primary.into().trim().to_owned();
    if primary.is_empty() {
        return Err(WordError::EmptyPrimary);
    }
    let secondary = text_secondary.into().trim().to_owned();
    if secondary.is_empty() {
        return Err(WordError::EmptySecondary);
    }
    Ok((primary, secondary))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn build_word() -> Word {
        Word::new(WordId::new(1), "  xin chào ", "안녕하세요", fixed_now()).unwrap()
    }

    #[test]
    fn new_word_is_trimmed_and_included() {
        let word = build_word();
        assert_eq!(word.text_primary(), "xin chào");
        assert_eq!(word.text_secondary(), "안녕하세요");
        assert!(word.included());
    }

    #[test]
    fn blank_texts_are_rejected() {
        let err = Word::new(WordId::new(1), "   ", "b", fixed_now()).unwrap_err();
        assert_eq!(err, WordError::EmptyPrimary);

        let err = Word::new(WordId::new(1), "a", "", fixed_now()).unwrap_err();
        assert_eq!(err, WordError::EmptySecondary);
    }

    #[test]
    fn edit_keeps_word_on_invalid_input() {
        let mut word = build_word();
        assert!(word.edit("cảm ơn", " ").is_err());
        assert_eq!(word.text_primary(), "xin chào");

        word.edit("cảm ơn", "감사합니다").unwrap();
        assert_eq!(word.text(Language::Primary), "cảm ơn");
        assert_eq!(word.text(Language::Secondary), "감사합니다");
    }

    #[test]
    fn toggle_flips_selection() {
        let mut word = build_word();
        assert!(!word.toggle_included());
        assert!(!word.included());
        assert!(word.toggle_included());
    }

    #[test]
    fn search_is_case_insensitive_over_both_texts() {
        let word = Word::new(WordId::new(2), "Phở Bò", "소고기 쌀국수", fixed_now()).unwrap();
        assert!(word.matches("phở"));
        assert!(word.matches("쌀국수"));
        assert!(word.matches(""));
        assert!(!word.matches("bún"));
    }

    #[test]
    fn from_persisted_restores_selection() {
        let word = Word::from_persisted(
            WordId::new(3),
            "một".into(),
            "하나".into(),
            false,
            fixed_now(),
        )
        .unwrap();
        assert!(!word.included());
    }
}
