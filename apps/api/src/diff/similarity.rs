//! Sentence-similarity diff.
//!
//! Splits both texts into sentences, scores each sentence against its best
//! counterpart by significant-word overlap, and reports the ones below the
//! threshold (broken down further at `,`/`;`). Coarser than the word LCS and
//! sensitive to sentence-boundary noise, but linear in memory.

use std::collections::HashSet;

use crate::diff::{is_noise, push_unique, ChangeKind, ChangePhrase, PhraseDiff};
use crate::document::normalize::{collapse_whitespace, normalize_word, strip_markdown};
use crate::document::DocumentText;

/// Sentences of this many characters or fewer are dropped.
pub const MIN_SENTENCE_CHARS: usize = 20;
/// Sub-phrases shorter than this are not reported on their own.
pub const MIN_SUBPHRASE_CHARS: usize = 15;
/// Best-match score below which a sentence counts as new.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;
/// Only words longer than this take part in scoring.
const SIGNIFICANT_WORD_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    text: String,
    start_word: usize,
    end_word: usize,
}

/// `matching words / max(len a, len b)` over significant words.
pub fn similarity(a: &str, b: &str) -> f64 {
    let words_a = significant_words(a);
    let words_b = significant_words(b);
    let longest = words_a.len().max(words_b.len());
    if longest == 0 {
        return if a.trim().eq_ignore_ascii_case(b.trim()) { 1.0 } else { 0.0 };
    }

    let lookup: HashSet<&str> = words_b.iter().map(String::as_str).collect();
    let matching = words_a
        .iter()
        .filter(|w| lookup.contains(w.as_str()))
        .count();
    matching as f64 / longest as f64
}

fn significant_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(normalize_word)
        .filter(|w| w.chars().count() > SIGNIFICANT_WORD_CHARS)
        .collect()
}

/// Splits `text` at any of `delimiters`, keeping trimmed pieces of at least
/// `min_chars` characters, with word offsets relative to `text`.
fn split_fragments(text: &str, delimiters: &[char], min_chars: usize) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut words_before = 0;

    for piece in text.split_inclusive(|c: char| delimiters.contains(&c)) {
        let word_count = piece.split_whitespace().count();
        let trimmed = piece.trim();
        if trimmed.chars().count() >= min_chars {
            fragments.push(Fragment {
                text: trimmed.to_string(),
                start_word: words_before,
                end_word: words_before + word_count,
            });
        }
        words_before += word_count;
    }
    fragments
}

fn sentences(text: &DocumentText) -> Vec<Fragment> {
    let stripped = collapse_whitespace(&strip_markdown(&text.raw));
    split_fragments(&stripped, &['.', '!', '?'], MIN_SENTENCE_CHARS + 1)
}

/// Sentences of `side` with no sufficiently similar sentence in `other`,
/// broken into sub-phrases.
fn unmatched(side: &[Fragment], other: &[Fragment], kind: ChangeKind) -> Vec<ChangePhrase> {
    let mut phrases = Vec::new();
    for sentence in side {
        let best = other
            .iter()
            .map(|o| similarity(&sentence.text, &o.text))
            .fold(0.0_f64, f64::max);
        if best >= SIMILARITY_THRESHOLD {
            continue;
        }

        for part in split_fragments(&sentence.text, &[',', ';'], MIN_SUBPHRASE_CHARS) {
            let text = part.text.trim_end_matches([',', ';']).trim().to_string();
            if is_noise(&text) {
                continue;
            }
            push_unique(
                &mut phrases,
                ChangePhrase::new(
                    text,
                    kind,
                    (
                        sentence.start_word + part.start_word,
                        sentence.start_word + part.end_word,
                    ),
                ),
            );
        }
    }
    phrases
}

pub fn diff(original: &DocumentText, rewritten: &DocumentText) -> PhraseDiff {
    let original_sentences = sentences(original);
    let rewritten_sentences = sentences(rewritten);

    PhraseDiff {
        additions: unmatched(&rewritten_sentences, &original_sentences, ChangeKind::Addition),
        removals: unmatched(&original_sentences, &rewritten_sentences, ChangeKind::Removal),
    }
}
