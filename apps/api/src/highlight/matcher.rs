//! Case-insensitive literal phrase search with first-claim-wins overlap rules.
//!
//! Every phrase is a separate regex scan, so cost is O(phrases × text length)
//! per text node.

use regex::Regex;
use tracing::warn;

/// A claimed byte range of the searched text and the phrase that claimed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    pub start: usize,
    pub end: usize,
    /// Index into the phrase slice the matcher was built from.
    pub phrase: usize,
}

#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    patterns: Vec<(usize, Regex)>,
}

impl PhraseMatcher {
    /// Longest phrases claim text first; ties keep input order.
    pub fn longest_first(phrases: &[String]) -> Self {
        let mut order: Vec<usize> = (0..phrases.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(phrases[i].chars().count()));
        Self::build(phrases, order, false)
    }

    /// Phrases claim text in the order given.
    pub fn in_order(phrases: &[String], whole_words: bool) -> Self {
        Self::build(phrases, (0..phrases.len()).collect(), whole_words)
    }

    fn build(phrases: &[String], order: Vec<usize>, whole_words: bool) -> Self {
        let patterns = order
            .into_iter()
            .filter_map(|i| {
                let source = pattern(&phrases[i], whole_words)?;
                match Regex::new(&source) {
                    Ok(regex) => Some((i, regex)),
                    Err(e) => {
                        warn!(phrase = %phrases[i], error = %e, "Skipping unmatchable phrase");
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Non-overlapping claims in `text`, sorted by position.
    pub fn find(&self, text: &str) -> Vec<Claim> {
        let mut claims: Vec<Claim> = Vec::new();
        for (phrase, regex) in &self.patterns {
            for m in regex.find_iter(text) {
                let overlaps = claims
                    .iter()
                    .any(|c| m.start() < c.end && c.start < m.end());
                if !overlaps {
                    claims.push(Claim {
                        start: m.start(),
                        end: m.end(),
                        phrase: *phrase,
                    });
                }
            }
        }
        claims.sort_by_key(|c| c.start);
        claims
    }
}

/// Escaped-literal pattern; inner whitespace matches any whitespace run.
fn pattern(phrase: &str, whole_words: bool) -> Option<String> {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    let body = words.join(r"\s+");

    let boundary = |c: Option<char>| {
        if whole_words && c.map(|c| c.is_alphanumeric() || c == '_').unwrap_or(false) {
            r"\b"
        } else {
            ""
        }
    };
    let trimmed = phrase.trim();
    let lead = boundary(trimmed.chars().next());
    let trail = boundary(trimmed.chars().last());
    Some(format!("(?i){lead}{body}{trail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrases(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let matcher = PhraseMatcher::longest_first(&phrases(&["rust"]));
        let claims = matcher.find("Rust and RUST");
        assert_eq!(claims.len(), 2);
        assert_eq!((claims[0].start, claims[0].end), (0, 4));
        assert_eq!((claims[1].start, claims[1].end), (9, 13));
    }

    #[test]
    fn test_longest_phrase_claims_first() {
        let list = phrases(&["cache", "distributed cache layer"]);
        let matcher = PhraseMatcher::longest_first(&list);
        let claims = matcher.find("a distributed cache layer and a cache");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].phrase, 1);
        assert_eq!(claims[1].phrase, 0);
        assert_eq!(claims[1].start, 32);
    }

    #[test]
    fn test_special_characters_are_literal() {
        let matcher = PhraseMatcher::longest_first(&phrases(&["C++ (advanced)"]));
        let claims = matcher.find("Knows C++ (advanced) well");
        assert_eq!(claims.len(), 1);
        assert!(matcher.find("Knows C (advanced)").is_empty());
    }

    #[test]
    fn test_whitespace_runs_match() {
        let matcher = PhraseMatcher::longest_first(&phrases(&["high performance"]));
        assert_eq!(matcher.find("high\n   performance").len(), 1);
    }

    #[test]
    fn test_whole_words_rejects_partial_match() {
        let list = phrases(&["SQL"]);
        assert!(PhraseMatcher::in_order(&list, true).find("PostgreSQL").is_empty());
        assert_eq!(PhraseMatcher::in_order(&list, true).find("SQL, Python").len(), 1);
        assert_eq!(PhraseMatcher::in_order(&list, false).find("PostgreSQL").len(), 1);
    }

    #[test]
    fn test_in_order_earlier_phrase_wins() {
        let list = phrases(&["data", "data pipelines"]);
        let claims = PhraseMatcher::in_order(&list, true).find("data pipelines");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].phrase, 0);
    }

    #[test]
    fn test_blank_phrase_is_ignored() {
        let matcher = PhraseMatcher::longest_first(&phrases(&["   "]));
        assert!(matcher.is_empty());
    }
}
