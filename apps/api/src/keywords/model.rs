use serde::{Deserialize, Serialize};

use crate::document::normalize::collapse_whitespace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    #[default]
    Keyword,
    Focus,
}

impl Classification {
    pub fn css_class(self) -> &'static str {
        match self {
            Classification::Keyword => "kw-keyword",
            Classification::Focus => "kw-focus",
        }
    }
}

/// A user-curated term. Unique per session by `keyword_key`; the first
/// spelling seen is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
    pub classification: Classification,
    pub occurrence_count: usize,
}

/// Identity of a keyword: whitespace collapsed, lowercased.
pub fn keyword_key(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordMarker {
    pub key: String,
    /// Surface text as it appears in the qualification text.
    pub text: String,
    pub classification: Classification,
}

/// One piece of the qualification text as rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Segment {
    /// Whitespace between words.
    Gap(String),
    /// A selectable word.
    Word(String),
    Marker(KeywordMarker),
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Gap(text) | Segment::Word(text) => text,
            Segment::Marker(marker) => &marker.text,
        }
    }
}

/// Final keyword lists handed to the rewrite job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSelection {
    #[serde(default, alias = "keywordFinal")]
    pub keyword_final: Vec<String>,
    #[serde(default, alias = "focusFinal")]
    pub focus_final: Vec<String>,
}

/// A keyword list edit coming from the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum KeywordEvent {
    Add {
        text: String,
        #[serde(default)]
        classification: Classification,
    },
    Delete {
        text: String,
    },
    Reclassify {
        text: String,
        classification: Classification,
    },
}
