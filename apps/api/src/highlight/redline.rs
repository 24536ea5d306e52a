//! Redline view: the rewritten document with insertions wrapped in place and
//! removed original text re-inserted at its aligned position.
//!
//! Positions come from the word alignment, not from text search, so repeated
//! phrases and phrases split across inline elements are placed exactly.
//! Insertion markers absorb one adjacent whitespace run and removal markers
//! carry their own separator, so dropping either leaves clean spacing.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::diff::lcs::{self, join_words};
use crate::diff::{is_noise, similarity, ChangeKind};
use crate::document::{Document, DocumentText, NodeId, NodeKind};
use crate::highlight::render::{inject_assets, render_additions};
use crate::highlight::{create_marker, MarkerIds, RenderedDocument};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Edit {
    /// Wrap `start..end` of the node text in an insertion marker.
    Insert {
        start: usize,
        end: usize,
        /// A removal sits right in front of this run.
        follows_removal: bool,
    },
    /// Insert a removal marker holding `text` at byte `at`.
    Remove { at: usize, text: String },
}

impl Edit {
    fn sort_key(&self) -> (usize, u8) {
        match self {
            Edit::Remove { at, .. } => (*at, 0),
            Edit::Insert { start, .. } => (*start, 1),
        }
    }
}

pub fn render_redline(original_html: &str, rewritten_html: &str) -> RenderedDocument {
    let original = DocumentText::from_html(original_html);
    let mut document = Document::parse(rewritten_html);
    let rewritten = DocumentText::from_document(&document);

    let Some(alignment) = lcs::align(&original.words, &rewritten.words) else {
        warn!(
            original_words = original.words.len(),
            rewritten_words = rewritten.words.len(),
            "Redline unavailable for oversized documents, marking additions only"
        );
        let fallback = similarity::diff(&original, &rewritten);
        let mut rendered = render_additions(rewritten_html, &fallback.additions);
        rendered.unplaced.extend(fallback.removals);
        return rendered;
    };

    let mut edits: BTreeMap<NodeId, Vec<Edit>> = BTreeMap::new();
    let mut orphans: Vec<String> = Vec::new();
    // Rewritten words with a removal placed directly in front of them.
    let mut anchors: HashSet<usize> = HashSet::new();

    for run in alignment.removal_runs() {
        let text = join_words(&original.words[run.start..run.end]);
        if is_noise(&text) {
            continue;
        }
        let behind_match = run
            .after
            .and_then(|j| rewritten.words[j].location)
            .map(|loc| (loc.node, loc.end, format!(" {text}")));
        let placement = behind_match
            .or_else(|| {
                let j = run.before?;
                let loc = rewritten.words[j].location?;
                anchors.insert(j);
                Some((loc.node, loc.start, format!("{text} ")))
            })
            .or_else(|| {
                rewritten
                    .words
                    .last()
                    .and_then(|w| w.location)
                    .map(|loc| (loc.node, loc.end, format!(" {text}")))
            });
        match placement {
            Some((node, at, text)) => edits.entry(node).or_default().push(Edit::Remove { at, text }),
            None => orphans.push(text),
        }
    }

    for run in alignment.addition_runs() {
        if is_noise(&join_words(&rewritten.words[run.start..run.end])) {
            continue;
        }
        // One insertion per text node, split again wherever a removal is anchored.
        let mut group: Option<(NodeId, usize, usize, usize)> = None;
        for j in run.start..run.end {
            let Some(loc) = rewritten.words[j].location else {
                continue;
            };
            group = match group {
                Some((node, start, _, first)) if node == loc.node && !anchors.contains(&j) => {
                    Some((node, start, loc.end, first))
                }
                Some(done) => {
                    push_insert(&mut edits, done, &anchors);
                    Some((loc.node, loc.start, loc.end, j))
                }
                None => Some((loc.node, loc.start, loc.end, j)),
            };
        }
        if let Some(done) = group {
            push_insert(&mut edits, done, &anchors);
        }
    }

    let mut ids = MarkerIds::default();
    let mut markers = Vec::new();
    for (node, mut node_edits) in edits {
        let Some(text) = document.text(node).map(str::to_owned) else {
            continue;
        };
        node_edits.sort_by_key(Edit::sort_key);

        let mut pieces = Vec::new();
        let mut cursor = 0;
        for edit in node_edits {
            let (start, next, marker) = match edit {
                Edit::Insert {
                    start,
                    end,
                    follows_removal,
                } => {
                    // A one-character piece of a run split across elements stays plain text.
                    if text[start..end].trim().chars().count() <= 1 {
                        continue;
                    }
                    let (start, end) = absorb_whitespace(&text, start, end, follows_removal);
                    if start < cursor {
                        warn!(start, cursor, "Skipping overlapping insertion");
                        continue;
                    }
                    let marker =
                        create_marker(&mut document, &mut ids, ChangeKind::Addition, &text[start..end]);
                    (start, end, marker)
                }
                Edit::Remove { at, text: removed } => {
                    // An insertion may already have absorbed the whitespace at `at`.
                    let at = at.max(cursor);
                    let marker = create_marker(&mut document, &mut ids, ChangeKind::Removal, &removed);
                    (at, at, marker)
                }
            };
            if start > cursor {
                pieces.push(document.create(NodeKind::text(&text[cursor..start])));
            }
            pieces.push(marker.node);
            markers.push(marker);
            cursor = next;
        }
        if cursor < text.len() {
            pieces.push(document.create(NodeKind::text(&text[cursor..])));
        }
        document.replace_with(node, &pieces);
    }

    if !orphans.is_empty() {
        let body = document
            .find_element("body")
            .unwrap_or_else(|| document.root());
        for text in orphans {
            let marker = create_marker(&mut document, &mut ids, ChangeKind::Removal, &text);
            document.append_child(body, marker.node);
            markers.push(marker);
        }
    }

    inject_assets(&mut document);
    debug!(
        matched = alignment.matched(),
        markers = markers.len(),
        "Rendered redline"
    );

    RenderedDocument {
        document,
        markers,
        unplaced: Vec::new(),
    }
}

fn push_insert(
    edits: &mut BTreeMap<NodeId, Vec<Edit>>,
    (node, start, end, first): (NodeId, usize, usize, usize),
    anchors: &HashSet<usize>,
) {
    edits.entry(node).or_default().push(Edit::Insert {
        start,
        end,
        follows_removal: anchors.contains(&first),
    });
}

/// Extends `start..end` over the whitespace after it or, at the end of the
/// text, the whitespace before it.
fn absorb_whitespace(text: &str, start: usize, end: usize, follows_removal: bool) -> (usize, usize) {
    let trailing = text[end..].len() - text[end..].trim_start().len();
    if trailing > 0 {
        return (start, end + trailing);
    }
    if follows_removal {
        return (start, end);
    }
    let leading = text[..start].len() - text[..start].trim_end().len();
    (start - leading, end)
}
