//! Word-level Longest Common Subsequence alignment.
//!
//! Algorithm:
//! 1. Precompute a comparison key per word (case-folded surface + normalized form)
//! 2. Fill a suffix LCS table over the two word sequences
//! 3. Walk forward from (0, 0): matches are taken greedily, ties prefer skipping
//!    the original word first, so output is deterministic
//! 4. Runs of unmatched original words are removals, runs of unmatched rewritten
//!    words are additions; a match closes both runs
//!
//! Memory is O(n × m); inputs above `MAX_LCS_CELLS` are refused and the caller
//! falls back to sentence similarity.

use crate::diff::{is_noise, push_unique, ChangeKind, ChangePhrase, PhraseDiff};
use crate::document::normalize::{normalize_word, Word};

/// Upper bound on DP table cells (~16 MB of `u32`).
pub const MAX_LCS_CELLS: usize = 4_000_000;

/// Normalized words shorter than this must match exactly (case-folded).
const SHORT_WORD_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignOp {
    /// original[i] matches rewritten[j]
    Equal(usize, usize),
    /// original[i] has no counterpart
    Delete(usize),
    /// rewritten[j] has no counterpart
    Insert(usize),
}

/// A contiguous run of unmatched words in one sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub start: usize,
    pub end: usize,
    /// For removal runs: the last matched rewritten word before the run.
    pub after: Option<usize>,
    /// For removal runs: the rewritten word the run sits in front of
    /// (`None` when it trails the whole document).
    pub before: Option<usize>,
}

impl Run {
    fn unanchored(start: usize, end: usize) -> Self {
        Run {
            start,
            end,
            after: None,
            before: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Alignment {
    pub ops: Vec<AlignOp>,
}

struct WordKey {
    folded: String,
    normalized: String,
}

impl WordKey {
    fn new(word: &str) -> Self {
        Self {
            folded: word.to_lowercase(),
            normalized: normalize_word(word),
        }
    }

    fn matches(&self, other: &WordKey) -> bool {
        if self.normalized.chars().count() < SHORT_WORD_CHARS
            || other.normalized.chars().count() < SHORT_WORD_CHARS
        {
            self.folded == other.folded
        } else {
            self.normalized == other.normalized
        }
    }
}

/// Word-equality predicate used by the alignment.
pub fn words_equal(a: &str, b: &str) -> bool {
    WordKey::new(a).matches(&WordKey::new(b))
}

/// Aligns two word sequences. Returns `None` when the table would exceed
/// `MAX_LCS_CELLS`.
pub fn align(original: &[Word], rewritten: &[Word]) -> Option<Alignment> {
    let n = original.len();
    let m = rewritten.len();
    if (n + 1).saturating_mul(m + 1) > MAX_LCS_CELLS {
        return None;
    }

    let a: Vec<WordKey> = original.iter().map(|w| WordKey::new(&w.text)).collect();
    let b: Vec<WordKey> = rewritten.iter().map(|w| WordKey::new(&w.text)).collect();

    // table[i * width + j] = LCS length of a[i..] and b[j..]
    let width = m + 1;
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if a[i].matches(&b[j]) {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i].matches(&b[j]) {
            ops.push(AlignOp::Equal(i, j));
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            ops.push(AlignOp::Delete(i));
            i += 1;
        } else {
            ops.push(AlignOp::Insert(j));
            j += 1;
        }
    }
    ops.extend((i..n).map(AlignOp::Delete));
    ops.extend((j..m).map(AlignOp::Insert));

    Some(Alignment { ops })
}

impl Alignment {
    pub fn matched(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, AlignOp::Equal(..)))
            .count()
    }

    /// Unmatched runs of the original, each anchored behind the last matched
    /// rewritten word before it and in front of the next rewritten word.
    pub fn removal_runs(&self) -> Vec<Run> {
        let mut runs = Vec::new();
        // (start, end, op position of the run's first delete, of its last delete)
        let mut current: Option<(usize, usize, usize, usize)> = None;

        for (pos, op) in self.ops.iter().enumerate() {
            match *op {
                AlignOp::Delete(i) => match current {
                    Some((start, end, first, _)) if end == i => {
                        current = Some((start, i + 1, first, pos))
                    }
                    Some(run) => {
                        runs.push(self.anchored(run));
                        current = Some((i, i + 1, pos, pos));
                    }
                    None => current = Some((i, i + 1, pos, pos)),
                },
                AlignOp::Equal(..) => {
                    if let Some(run) = current.take() {
                        runs.push(self.anchored(run));
                    }
                }
                AlignOp::Insert(_) => {}
            }
        }
        if let Some(run) = current {
            runs.push(self.anchored(run));
        }
        runs
    }

    fn anchored(&self, (start, end, first, last): (usize, usize, usize, usize)) -> Run {
        let after = self.ops[..first].iter().rev().find_map(|op| match *op {
            AlignOp::Equal(_, j) => Some(j),
            _ => None,
        });
        let before = self.ops[last + 1..].iter().find_map(|op| match *op {
            AlignOp::Equal(_, j) | AlignOp::Insert(j) => Some(j),
            AlignOp::Delete(_) => None,
        });
        Run {
            start,
            end,
            after,
            before,
        }
    }

    /// Unmatched runs of the rewritten sequence.
    pub fn addition_runs(&self) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();
        let mut current: Option<(usize, usize)> = None;

        for op in &self.ops {
            match *op {
                AlignOp::Insert(j) => match current {
                    Some((start, end)) if end == j => current = Some((start, j + 1)),
                    Some((start, end)) => {
                        runs.push(Run::unanchored(start, end));
                        current = Some((j, j + 1));
                    }
                    None => current = Some((j, j + 1)),
                },
                AlignOp::Equal(..) => {
                    if let Some((start, end)) = current.take() {
                        runs.push(Run::unanchored(start, end));
                    }
                }
                AlignOp::Delete(_) => {}
            }
        }
        if let Some((start, end)) = current {
            runs.push(Run::unanchored(start, end));
        }
        runs
    }

    /// Collapses the alignment into phrase lists, dropping noise and duplicates.
    pub fn phrases(&self, original: &[Word], rewritten: &[Word]) -> PhraseDiff {
        let mut diff = PhraseDiff::default();

        for run in self.removal_runs() {
            let text = join_words(&original[run.start..run.end]);
            if !is_noise(&text) {
                push_unique(
                    &mut diff.removals,
                    ChangePhrase::new(text, ChangeKind::Removal, (run.start, run.end)),
                );
            }
        }
        for run in self.addition_runs() {
            let text = join_words(&rewritten[run.start..run.end]);
            if !is_noise(&text) {
                push_unique(
                    &mut diff.additions,
                    ChangePhrase::new(text, ChangeKind::Addition, (run.start, run.end)),
                );
            }
        }
        diff
    }
}

pub fn join_words(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<Word> {
        text.split_whitespace()
            .enumerate()
            .map(|(index, w)| Word {
                text: w.to_string(),
                index,
                location: None,
            })
            .collect()
    }

    #[test]
    fn test_words_equal_ignores_case_and_punctuation() {
        assert!(words_equal("Cache.", "cache"));
        assert!(words_equal("**Rust**", "rust,"));
        assert!(!words_equal("cache", "caches"));
    }

    #[test]
    fn test_short_words_need_exact_match() {
        assert!(words_equal("a", "A"));
        assert!(!words_equal("a", "a,"));
        assert!(!words_equal("to", "to."));
    }

    #[test]
    fn test_identical_sequences_align_fully() {
        let a = words("Built a distributed cache");
        let alignment = align(&a, &a).unwrap();
        assert_eq!(alignment.matched(), 4);
        assert!(alignment.removal_runs().is_empty());
        assert!(alignment.addition_runs().is_empty());
    }

    #[test]
    fn test_insertions_are_grouped_into_runs() {
        let a = words("Built a cache.");
        let b = words("Built a high-performance cache system.");
        let alignment = align(&a, &b).unwrap();
        let runs = alignment.addition_runs();
        assert_eq!(runs.len(), 2);
        assert_eq!((runs[0].start, runs[0].end), (2, 3));
        assert_eq!((runs[1].start, runs[1].end), (4, 5));
        assert!(alignment.removal_runs().is_empty());
    }

    #[test]
    fn test_replacement_yields_anchored_removal() {
        let a = words("Led team of five");
        let b = words("Managed team of five");
        let alignment = align(&a, &b).unwrap();
        let removals = alignment.removal_runs();
        assert_eq!(removals.len(), 1);
        assert_eq!((removals[0].start, removals[0].end), (0, 1));
        assert_eq!(removals[0].after, None);
        assert_eq!(removals[0].before, Some(0));
        assert_eq!(alignment.addition_runs()[0].start, 0);
    }

    #[test]
    fn test_trailing_removal_follows_last_match() {
        let a = words("Shipped the release on time");
        let b = words("Shipped the release");
        let alignment = align(&a, &b).unwrap();
        let removals = alignment.removal_runs();
        assert_eq!(removals.len(), 1);
        assert_eq!((removals[0].start, removals[0].end), (3, 5));
        assert_eq!(removals[0].after, Some(2));
        assert_eq!(removals[0].before, None);
    }

    #[test]
    fn test_inner_removal_is_anchored_behind_previous_match() {
        let a = words("Shipped the billing platform on time Mentored interns");
        let b = words("Shipped the billing platform Mentored interns");
        let removals = align(&a, &b).unwrap().removal_runs();
        assert_eq!(removals.len(), 1);
        assert_eq!((removals[0].start, removals[0].end), (4, 6));
        assert_eq!(removals[0].after, Some(3));
        assert_eq!(removals[0].before, Some(4));
    }

    #[test]
    fn test_phrases_join_words_and_drop_noise() {
        let a = words("I built it");
        let b = words("I built it , and scaled it");
        let diff = align(&a, &b).unwrap().phrases(&a, &b);
        assert_eq!(diff.addition_texts(), vec![", and scaled it"]);
        assert!(diff.removals.is_empty());
    }

    #[test]
    fn test_noise_only_changes_are_dropped() {
        let a = words("Built it");
        let b = words("Built it !");
        let diff = align(&a, &b).unwrap().phrases(&a, &b);
        assert!(diff.additions.is_empty());
    }

    #[test]
    fn test_alignment_is_deterministic() {
        let a = words("alpha beta gamma delta");
        let b = words("gamma alpha delta beta");
        let first = align(&a, &b).unwrap();
        let second = align(&a, &b).unwrap();
        assert_eq!(first.ops, second.ops);
    }

    #[test]
    fn test_oversized_input_is_refused() {
        let big: Vec<Word> = (0..2100)
            .map(|index| Word {
                text: format!("w{index}"),
                index,
                location: None,
            })
            .collect();
        assert!(align(&big, &big).is_none());
    }
}
