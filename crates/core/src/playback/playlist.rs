use crate::model::{Word, WordId};

/// Ordered snapshot of the included words for one playback session.
///
/// Words with `included == false` never make it into a playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    words: Vec<Word>,
}

impl Playlist {
    #[must_use]
    pub fn from_words(words: impl IntoIterator<Item = Word>) -> Self {
        Self {
            words: words.into_iter().filter(Word::included).collect(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Word> {
        self.words.get(position)
    }

    #[must_use]
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn ids(&self) -> impl Iterator<Item = WordId> + '_ {
        self.words.iter().map(Word::id)
    }

    /// Two playlists share an identity when they hold the same word ids in the same order.
    /// Text edits do not change identity.
    #[must_use]
    pub fn same_identity(&self, other: &Playlist) -> bool {
        self.len() == other.len() && self.ids().eq(other.ids())
    }
}
