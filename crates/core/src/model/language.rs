use serde::{Deserialize, Serialize};

/// Which side of a word pair is being spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Primary,
    Secondary,
}

impl Language {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Primary => "primary",
            Language::Secondary => "secondary",
        }
    }
}
