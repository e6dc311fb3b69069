use std::sync::Arc;

use drill_core::model::{Word, WordId};
use storage::repository::{NewWordRecord, StorageError, WordRepository};
use tracing::info;

use crate::Clock;
use crate::error::WordServiceError;

/// Manages the word list: creation, edits, selection and removal.
#[derive(Clone)]
pub struct WordService {
    clock: Clock,
    words: Arc<dyn WordRepository>,
}

impl WordService {
    #[must_use]
    pub fn new(clock: Clock, words: Arc<dyn WordRepository>) -> Self {
        Self { clock, words }
    }

    /// Validate and persist a new word pair. New words are selected for playback.
    ///
    /// # Errors
    ///
    /// Returns `WordServiceError::Word` for empty texts.
    /// Returns `WordServiceError::Storage` if persistence fails.
    pub async fn add_word(
        &self,
        text_primary: &str,
        text_secondary: &str,
    ) -> Result<Word, WordServiceError> {
        let now = self.clock.now();
        // Placeholder id; the store assigns the real one.
        let draft = Word::new(WordId::new(0), text_primary, text_secondary, now)?;
        let id = self
            .words
            .insert_new_word(NewWordRecord::from_word(&draft))
            .await?;
        let word = Word::from_persisted(
            id,
            draft.text_primary().to_owned(),
            draft.text_secondary().to_owned(),
            draft.included(),
            now,
        )?;
        info!(word_id = %id, "word added");
        Ok(word)
    }

    /// Replace both texts of an existing word.
    ///
    /// # Errors
    ///
    /// Returns `WordServiceError::NotFound` if the word does not exist.
    /// Returns `WordServiceError::Word` for empty texts; nothing is stored then.
    pub async fn edit_word(
        &self,
        id: WordId,
        text_primary: &str,
        text_secondary: &str,
    ) -> Result<Word, WordServiceError> {
        let mut word = self.require(id).await?;
        word.edit(text_primary, text_secondary)?;
        self.words.upsert_word(&word).await?;
        Ok(word)
    }

    /// Flip whether the word takes part in playback. Returns the updated word.
    ///
    /// # Errors
    ///
    /// Returns `WordServiceError::NotFound` if the word does not exist.
    pub async fn toggle_included(&self, id: WordId) -> Result<Word, WordServiceError> {
        let mut word = self.require(id).await?;
        let included = word.toggle_included();
        self.words.upsert_word(&word).await?;
        info!(word_id = %id, included, "word selection changed");
        Ok(word)
    }

    /// # Errors
    ///
    /// Returns `WordServiceError::NotFound` if the word does not exist.
    pub async fn delete_word(&self, id: WordId) -> Result<(), WordServiceError> {
        match self.words.delete_word(id).await {
            Ok(()) => {
                info!(word_id = %id, "word removed");
                Ok(())
            }
            Err(StorageError::NotFound) => Err(WordServiceError::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Words matching `query` (case-insensitive, either language), sorted
    /// alphabetically by primary text. An empty query lists everything.
    ///
    /// # Errors
    ///
    /// Returns `WordServiceError::Storage` on read failures.
    pub async fn list_words(&self, query: &str) -> Result<Vec<Word>, WordServiceError> {
        let query = query.trim();
        let mut words: Vec<Word> = self
            .words
            .list_words()
            .await?
            .into_iter()
            .filter(|w| w.matches(query))
            .collect();
        words.sort_by_cached_key(|w| (w.text_primary().to_lowercase(), w.id()));
        Ok(words)
    }

    /// Words currently selected for playback, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `WordServiceError::Storage` on read failures.
    pub async fn included_words(&self) -> Result<Vec<Word>, WordServiceError> {
        Ok(self.words.list_included_words().await?)
    }

    async fn require(&self, id: WordId) -> Result<Word, WordServiceError> {
        self.words
            .get_word(id)
            .await?
            .ok_or(WordServiceError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::WordError;
    use drill_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn service() -> WordService {
        WordService::new(fixed_clock(), Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn add_word_trims_and_selects() {
        let svc = service();
        let word = svc.add_word("  xin chào ", "안녕하세요").await.unwrap();
        assert_eq!(word.id(), WordId::new(1));
        assert_eq!(word.text_primary(), "xin chào");
        assert!(word.included());
        assert_eq!(svc.included_words().await.unwrap(), vec![word]);
    }

    #[tokio::test]
    async fn add_word_rejects_blank_text() {
        let svc = service();
        let err = svc.add_word("cảm ơn", "   ").await.unwrap_err();
        assert!(matches!(err, WordServiceError::Word(WordError::EmptySecondary)));
        assert!(svc.list_words("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn edit_with_blank_text_keeps_stored_word() {
        let svc = service();
        let word = svc.add_word("nước", "물").await.unwrap();
        assert!(svc.edit_word(word.id(), "", "물").await.is_err());

        let edited = svc.edit_word(word.id(), "nước ngọt", "음료수").await.unwrap();
        assert_eq!(edited.text_secondary(), "음료수");
        assert_eq!(svc.list_words("").await.unwrap(), vec![edited]);
    }

    #[tokio::test]
    async fn toggle_removes_word_from_playback_selection() {
        let svc = service();
        let a = svc.add_word("một", "하나").await.unwrap();
        let b = svc.add_word("hai", "둘").await.unwrap();

        let toggled = svc.toggle_included(a.id()).await.unwrap();
        assert!(!toggled.included());
        assert_eq!(svc.included_words().await.unwrap(), vec![b]);

        assert!(svc.toggle_included(a.id()).await.unwrap().included());
    }

    #[tokio::test]
    async fn list_filters_and_sorts_alphabetically() {
        let svc = service();
        svc.add_word("trà", "차").await.unwrap();
        svc.add_word("Bánh mì", "빵").await.unwrap();
        svc.add_word("cà phê", "커피").await.unwrap();

        let all: Vec<String> = svc
            .list_words("")
            .await
            .unwrap()
            .iter()
            .map(|w| w.text_primary().to_owned())
            .collect();
        assert_eq!(all, vec!["Bánh mì", "cà phê", "trà"]);

        let hits = svc.list_words("커피").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text_primary(), "cà phê");
    }

    #[tokio::test]
    async fn missing_words_are_reported_by_id() {
        let svc = service();
        let id = WordId::new(42);
        assert!(matches!(
            svc.toggle_included(id).await,
            Err(WordServiceError::NotFound(found)) if found == id
        ));
        assert!(matches!(
            svc.delete_word(id).await,
            Err(WordServiceError::NotFound(_))
        ));
    }
}
