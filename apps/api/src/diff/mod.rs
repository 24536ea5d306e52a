//! Alignment engine: finds added and removed phrases between an original
//! résumé and its rewritten version.
//!
//! Two strategies are available. `WordLcs` (default) aligns word sequences and
//! reports every unmatched run; `SentenceSimilarity` reports whole sentences
//! (or their `,`/`;` sub-phrases) that have no close counterpart. Both ignore
//! case and markdown decoration and are deterministic.

pub mod lcs;
pub mod similarity;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::{normalize, DocumentText};

/// Phrases whose normalized text is shorter than this are noise.
pub const MIN_PHRASE_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStrategy {
    #[default]
    WordLcs,
    SentenceSimilarity,
}

impl FromStr for DiffStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lcs" | "word_lcs" => Ok(DiffStrategy::WordLcs),
            "similarity" | "sentence_similarity" => Ok(DiffStrategy::SentenceSimilarity),
            other => Err(format!("unknown diff strategy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Addition,
    Removal,
}

impl ChangeKind {
    /// Prefix of marker change ids (`ins-3`, `del-7`).
    pub fn id_prefix(self) -> &'static str {
        match self {
            ChangeKind::Addition => "ins",
            ChangeKind::Removal => "del",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Addition => "addition",
            ChangeKind::Removal => "removal",
        }
    }
}

/// A contiguous run of words present on one side only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePhrase {
    pub text: String,
    pub kind: ChangeKind,
    /// Start/end (exclusive) word indices in the source `DocumentText`.
    pub source_span: (usize, usize),
}

impl ChangePhrase {
    pub fn new(text: String, kind: ChangeKind, source_span: (usize, usize)) -> Self {
        Self {
            text,
            kind,
            source_span,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhraseDiff {
    pub additions: Vec<ChangePhrase>,
    pub removals: Vec<ChangePhrase>,
}

impl PhraseDiff {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    pub fn addition_texts(&self) -> Vec<String> {
        self.additions.iter().map(|p| p.text.clone()).collect()
    }

    pub fn removal_texts(&self) -> Vec<String> {
        self.removals.iter().map(|p| p.text.clone()).collect()
    }
}

/// Diffs two HTML documents with the default strategy.
pub fn diff(original_html: &str, rewritten_html: &str) -> PhraseDiff {
    diff_with(original_html, rewritten_html, DiffStrategy::default())
}

/// Diffs two HTML documents. Unusable input yields an empty diff, never an error.
pub fn diff_with(original_html: &str, rewritten_html: &str, strategy: DiffStrategy) -> PhraseDiff {
    if original_html.trim().is_empty() || rewritten_html.trim().is_empty() {
        warn!(
            original_empty = original_html.trim().is_empty(),
            rewritten_empty = rewritten_html.trim().is_empty(),
            "Diff unavailable: empty document"
        );
        return PhraseDiff::default();
    }

    let original = DocumentText::from_html(original_html);
    let rewritten = DocumentText::from_html(rewritten_html);
    diff_texts(&original, &rewritten, strategy)
}

pub fn diff_texts(
    original: &DocumentText,
    rewritten: &DocumentText,
    strategy: DiffStrategy,
) -> PhraseDiff {
    if original.is_empty() && rewritten.is_empty() {
        warn!("Diff unavailable: neither document has visible text");
        return PhraseDiff::default();
    }

    let result = match strategy {
        DiffStrategy::WordLcs => match lcs::align(&original.words, &rewritten.words) {
            Some(alignment) => alignment.phrases(&original.words, &rewritten.words),
            None => {
                warn!(
                    original_words = original.words.len(),
                    rewritten_words = rewritten.words.len(),
                    "Word alignment exceeds table budget, falling back to sentence similarity"
                );
                similarity::diff(original, rewritten)
            }
        },
        DiffStrategy::SentenceSimilarity => similarity::diff(original, rewritten),
    };

    debug!(
        ?strategy,
        additions = result.additions.len(),
        removals = result.removals.len(),
        "Diff computed"
    );
    result
}

pub(crate) fn is_noise(text: &str) -> bool {
    normalize(text).chars().count() < MIN_PHRASE_CHARS
}

/// Appends `phrase` unless an equal phrase (after normalization) is present.
pub(crate) fn push_unique(list: &mut Vec<ChangePhrase>, phrase: ChangePhrase) {
    let key = normalize(&phrase.text);
    if !list.iter().any(|p| normalize(&p.text) == key) {
        list.push(phrase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = "<body><p>Built a cache.</p></body>";
    const REWRITTEN: &str = "<body><p>Built a high-performance cache system.</p></body>";

    #[test]
    fn test_identical_input_has_empty_diff() {
        let html = "<html><body><h1>Jane Doe</h1><ul><li>Led a team of 5</li><li>Shipped **v2**</li></ul></body></html>";
        for strategy in [DiffStrategy::WordLcs, DiffStrategy::SentenceSimilarity] {
            let result = diff_with(html, html, strategy);
            assert!(result.is_empty(), "{strategy:?}: {result:?}");
        }
    }

    #[test]
    fn test_cache_scenario_reports_additions_only() {
        let result = diff(ORIGINAL, REWRITTEN);
        let additions = result.addition_texts();
        assert!(additions.iter().any(|a| a.contains("high-performance")));
        assert!(additions.iter().any(|a| a.contains("system")));
        assert!(result.removals.is_empty());
    }

    #[test]
    fn test_removed_words_are_reported() {
        let result = diff(
            "<p>Maintained legacy billing scripts and dashboards</p>",
            "<p>Maintained dashboards</p>",
        );
        assert_eq!(result.removal_texts(), vec!["legacy billing scripts and"]);
        assert!(result.additions.is_empty());
    }

    #[test]
    fn test_case_and_markdown_are_ignored() {
        let result = diff("<p>**Led** the TEAM</p>", "<p>led the team</p>");
        assert!(result.is_empty(), "{result:?}");
    }

    #[test]
    fn test_empty_input_yields_empty_diff() {
        assert!(diff("", REWRITTEN).is_empty());
        assert!(diff(ORIGINAL, "   ").is_empty());
    }

    #[test]
    fn test_diff_is_deterministic() {
        let a = diff(ORIGINAL, REWRITTEN);
        let b = diff(ORIGINAL, REWRITTEN);
        assert_eq!(a, b);
    }

    #[test]
    fn test_duplicate_phrases_are_reported_once() {
        let result = diff(
            "<p>Built tools.</p><p>Built apps.</p>",
            "<p>Built internal tools.</p><p>Built internal apps.</p>",
        );
        assert_eq!(result.addition_texts(), vec!["internal"]);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("lcs".parse::<DiffStrategy>().unwrap(), DiffStrategy::WordLcs);
        assert_eq!(
            "Similarity".parse::<DiffStrategy>().unwrap(),
            DiffStrategy::SentenceSimilarity
        );
        assert!("levenshtein".parse::<DiffStrategy>().is_err());
    }
}
