//! Keyword selection over a qualification text block.
//!
//! The text is held as a flat segment list (words, whitespace gaps, keyword
//! markers). Every mutation rebuilds the list: markers are kept, everything
//! else is merged back into plain runs and re-tokenized, so no stale word
//! segment survives an edit.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::document::normalize::collapse_whitespace;
use crate::document::tree::{escape_attr, escape_text};
use crate::highlight::PhraseMatcher;
use crate::keywords::model::{
    keyword_key, Classification, Keyword, KeywordEvent, KeywordMarker, KeywordSelection, Segment,
};

#[derive(Debug, Clone)]
enum Piece {
    Plain(String),
    Marker(KeywordMarker),
}

#[derive(Debug, Clone, Default)]
pub struct KeywordSelectionEngine {
    segments: Vec<Segment>,
    keywords: Vec<Keyword>,
}

impl KeywordSelectionEngine {
    /// Initial highlighting pass.
    ///
    /// Candidates are the backend keywords followed by the previously saved
    /// lists, deduplicated case-insensitively. Each candidate claims its
    /// non-overlapping whole-word occurrences in order, so earlier candidates
    /// win contested text. A candidate is `Focus` when the saved focus list
    /// contains it.
    pub fn initial(text: &str, keywords: &[String], prior: &KeywordSelection) -> Self {
        let focus: HashSet<String> = prior.focus_final.iter().map(|k| keyword_key(k)).collect();

        let mut list: Vec<Keyword> = Vec::new();
        let mut seen = HashSet::new();
        for candidate in keywords
            .iter()
            .chain(&prior.keyword_final)
            .chain(&prior.focus_final)
        {
            let text = collapse_whitespace(candidate);
            let key = keyword_key(&text);
            if key.is_empty() || !seen.insert(key.clone()) {
                continue;
            }
            let classification = if focus.contains(&key) {
                Classification::Focus
            } else {
                Classification::Keyword
            };
            list.push(Keyword {
                text,
                classification,
                occurrence_count: 0,
            });
        }

        let mut engine = Self {
            segments: Vec::new(),
            keywords: list,
        };
        let pieces = engine.mark(vec![Piece::Plain(text.to_string())], &engine.keywords);
        engine.segments = tokenize(pieces);
        engine.recount_occurrences();

        info!(
            keywords = engine.keywords.len(),
            markers = engine.marker_count(),
            "Keyword highlighting initialised"
        );
        engine
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    pub fn keyword(&self, text: &str) -> Option<&Keyword> {
        let key = keyword_key(text);
        self.keywords.iter().find(|k| keyword_key(&k.text) == key)
    }

    fn marker_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Marker(_)))
            .count()
    }

    pub fn is_word(&self, index: usize) -> bool {
        matches!(self.segments.get(index), Some(Segment::Word(_)))
    }

    pub fn is_marker(&self, index: usize) -> bool {
        matches!(self.segments.get(index), Some(Segment::Marker(_)))
    }

    /// Adds a keyword and marks its occurrences in the unmarked text. A
    /// keyword that already exists (ignoring case) is left as it is.
    pub fn add_keyword(&mut self, text: &str, classification: Classification) -> bool {
        let text = collapse_whitespace(text);
        if text.is_empty() || self.keyword(&text).is_some() {
            return false;
        }

        let keyword = Keyword {
            text,
            classification,
            occurrence_count: 0,
        };
        let pieces = self.mark(self.pieces(), std::slice::from_ref(&keyword));
        let mut keywords = self.keywords.clone();
        keywords.push(keyword);
        self.keywords = keywords;
        self.segments = tokenize(pieces);
        self.recount_occurrences();
        debug!(keyword_count = self.keywords.len(), "Keyword added");
        true
    }

    /// Removes a keyword; its markers turn back into selectable words.
    pub fn delete_keyword(&mut self, text: &str) -> bool {
        let key = keyword_key(text);
        if self.keyword(&key).is_none() {
            return false;
        }

        self.keywords = self
            .keywords
            .iter()
            .filter(|k| keyword_key(&k.text) != key)
            .cloned()
            .collect();
        let pieces = self
            .pieces()
            .into_iter()
            .map(|piece| match piece {
                Piece::Marker(marker) if marker.key == key => Piece::Plain(marker.text),
                other => other,
            })
            .collect();
        self.segments = tokenize(pieces);
        self.recount_occurrences();
        debug!(keyword_count = self.keywords.len(), "Keyword deleted");
        true
    }

    /// Relabels a keyword and every one of its markers.
    pub fn reclassify(&mut self, text: &str, classification: Classification) -> bool {
        let key = keyword_key(text);
        if self.keyword(&key).is_none() {
            return false;
        }

        self.keywords = self
            .keywords
            .iter()
            .map(|k| {
                if keyword_key(&k.text) == key {
                    Keyword {
                        classification,
                        ..k.clone()
                    }
                } else {
                    k.clone()
                }
            })
            .collect();
        self.segments = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Marker(marker) if marker.key == key => Segment::Marker(KeywordMarker {
                    classification,
                    ..marker.clone()
                }),
                other => other.clone(),
            })
            .collect();
        true
    }

    /// Sets every keyword's count to the number of live markers carrying it.
    pub fn recount_occurrences(&mut self) {
        let keys: Vec<&str> = self
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Marker(marker) => Some(marker.key.as_str()),
                _ => None,
            })
            .collect();
        self.keywords = self
            .keywords
            .iter()
            .map(|k| {
                let key = keyword_key(&k.text);
                Keyword {
                    occurrence_count: keys.iter().filter(|&&m| m == key).count(),
                    ..k.clone()
                }
            })
            .collect();
    }

    pub fn apply(&mut self, event: &KeywordEvent) -> bool {
        match event {
            KeywordEvent::Add {
                text,
                classification,
            } => self.add_keyword(text, *classification),
            KeywordEvent::Delete { text } => self.delete_keyword(text),
            KeywordEvent::Reclassify {
                text,
                classification,
            } => self.reclassify(text, *classification),
        }
    }

    /// Merges the words from segment `first` to `last` into one marker and
    /// registers their space-joined text as a keyword. The marker keeps the
    /// text as written, line breaks included. Refused when either end is not a
    /// word or the range contains a marker.
    pub fn commit_selection(&mut self, first: usize, last: usize) -> Option<String> {
        let (lo, hi) = if first <= last { (first, last) } else { (last, first) };
        if !self.is_word(lo) || !self.is_word(hi) {
            return None;
        }
        let range = &self.segments[lo..=hi];
        if range.iter().any(|s| matches!(s, Segment::Marker(_))) {
            return None;
        }

        let text = range
            .iter()
            .filter_map(|s| match s {
                Segment::Word(word) => Some(word.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ");
        let surface: String = range.iter().map(Segment::text).collect();
        let key = keyword_key(&text);

        let classification = match self.keyword(&key) {
            Some(existing) => existing.classification,
            None => {
                let mut keywords = self.keywords.clone();
                keywords.push(Keyword {
                    text: text.clone(),
                    classification: Classification::Keyword,
                    occurrence_count: 0,
                });
                self.keywords = keywords;
                Classification::Keyword
            }
        };

        let mut segments = Vec::with_capacity(self.segments.len() - (hi - lo));
        segments.extend_from_slice(&self.segments[..lo]);
        segments.push(Segment::Marker(KeywordMarker {
            key,
            text: surface,
            classification,
        }));
        segments.extend_from_slice(&self.segments[hi + 1..]);
        self.segments = segments;
        self.recount_occurrences();
        debug!(selection = %text, "Selection committed as keyword");
        Some(text)
    }

    pub fn finalize(&self) -> KeywordSelection {
        let of = |class: Classification| {
            self.keywords
                .iter()
                .filter(|k| k.classification == class)
                .map(|k| k.text.clone())
                .collect::<Vec<String>>()
        };
        KeywordSelection {
            keyword_final: of(Classification::Keyword),
            focus_final: of(Classification::Focus),
        }
    }

    /// The segment list as HTML: `span.kw-selectable` per word and
    /// `span.kw-marker` per keyword occurrence, both carrying `data-index`.
    pub fn render_html(&self) -> String {
        let mut out = String::new();
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Gap(gap) => escape_text(gap, &mut out),
                Segment::Word(word) => {
                    out.push_str(&format!("<span class=\"kw-selectable\" data-index=\"{index}\">"));
                    escape_text(word, &mut out);
                    out.push_str("</span>");
                }
                Segment::Marker(marker) => {
                    out.push_str(&format!(
                        "<span class=\"kw-marker {}\" data-index=\"{index}\" data-keyword=\"",
                        marker.classification.css_class()
                    ));
                    escape_attr(&marker.key, &mut out);
                    out.push_str("\">");
                    escape_text(&marker.text, &mut out);
                    out.push_str("</span>");
                }
            }
        }
        out
    }

    fn pieces(&self) -> Vec<Piece> {
        let mut pieces: Vec<Piece> = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Marker(marker) => pieces.push(Piece::Marker(marker.clone())),
                plain => match pieces.last_mut() {
                    Some(Piece::Plain(run)) => run.push_str(plain.text()),
                    _ => pieces.push(Piece::Plain(plain.text().to_string())),
                },
            }
        }
        pieces
    }

    /// Marks occurrences of `keywords` inside the plain pieces.
    fn mark(&self, pieces: Vec<Piece>, keywords: &[Keyword]) -> Vec<Piece> {
        let texts: Vec<String> = keywords.iter().map(|k| k.text.clone()).collect();
        let matcher = PhraseMatcher::in_order(&texts, true);
        if matcher.is_empty() {
            return pieces;
        }

        let mut out = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let Piece::Plain(run) = piece else {
                out.push(piece);
                continue;
            };
            let mut cursor = 0;
            for claim in matcher.find(&run) {
                if claim.start > cursor {
                    out.push(Piece::Plain(run[cursor..claim.start].to_string()));
                }
                let keyword = &keywords[claim.phrase];
                out.push(Piece::Marker(KeywordMarker {
                    key: keyword_key(&keyword.text),
                    text: run[claim.start..claim.end].to_string(),
                    classification: keyword.classification,
                }));
                cursor = claim.end;
            }
            if cursor < run.len() {
                out.push(Piece::Plain(run[cursor..].to_string()));
            }
        }
        out
    }
}

/// Splits plain runs into word and gap segments; markers pass through.
/// Adjacent plain runs are joined first so a former marker fuses with the
/// text around it.
fn tokenize(pieces: Vec<Piece>) -> Vec<Segment> {
    let mut merged: Vec<Piece> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        if let Piece::Plain(next) = &piece {
            if let Some(Piece::Plain(run)) = merged.last_mut() {
                run.push_str(next);
                continue;
            }
        }
        merged.push(piece);
    }

    let mut segments = Vec::new();
    for piece in merged {
        match piece {
            Piece::Marker(marker) => segments.push(Segment::Marker(marker)),
            Piece::Plain(run) => {
                let mut current = String::new();
                let mut in_gap = false;
                for c in run.chars() {
                    if !current.is_empty() && c.is_whitespace() != in_gap {
                        segments.push(segment(std::mem::take(&mut current), in_gap));
                    }
                    in_gap = c.is_whitespace();
                    current.push(c);
                }
                if !current.is_empty() {
                    segments.push(segment(current, in_gap));
                }
            }
        }
    }
    segments
}

fn segment(text: String, gap: bool) -> Segment {
    if gap {
        Segment::Gap(text)
    } else {
        Segment::Word(text)
    }
}
