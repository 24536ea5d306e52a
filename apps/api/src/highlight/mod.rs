//! Highlight renderer: writes change markers into a parsed résumé.
//!
//! Two views are produced from one diff:
//! - side-by-side (`render_additions` / `render_removals`): each phrase list is
//!   matched back onto its own document by text search
//! - redline (`render_redline`): one document holding both insertions and
//!   removals at their aligned positions; the reconciler works on this one

pub mod assets;
pub mod matcher;
pub mod redline;
pub mod render;

use serde::Serialize;

use crate::diff::{ChangeKind, ChangePhrase};
use crate::document::{Document, NodeId};

pub use matcher::PhraseMatcher;
pub use redline::render_redline;
pub use render::{render_additions, render_removals};

/// Attribute carrying a marker's change id.
pub const CHANGE_ID_ATTR: &str = "data-change-id";
pub const CHANGE_KIND_ATTR: &str = "data-change-kind";
pub const STATE_ATTR: &str = "data-state";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerState {
    /// Insertion kept / removal applied.
    #[default]
    Accepted,
    /// Insertion dropped / removal restored.
    Rejected,
}

impl MarkerState {
    pub fn toggled(self) -> Self {
        match self {
            MarkerState::Accepted => MarkerState::Rejected,
            MarkerState::Rejected => MarkerState::Accepted,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MarkerState::Accepted => "accepted",
            MarkerState::Rejected => "rejected",
        }
    }
}

/// A span in a rendered document wrapping one change occurrence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeMarker {
    pub change_id: String,
    pub kind: ChangeKind,
    pub text: String,
    pub state: MarkerState,
    #[serde(skip)]
    pub node: NodeId,
}

/// Output of a render pass.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub document: Document,
    pub markers: Vec<ChangeMarker>,
    /// Phrases that could not be placed in the document.
    pub unplaced: Vec<ChangePhrase>,
}

impl RenderedDocument {
    pub fn html(&self) -> String {
        self.document.to_html()
    }
}

pub fn marker_class(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Addition => "change-highlight-add",
        ChangeKind::Removal => "change-highlight-remove",
    }
}

/// Hands out `ins-N` / `del-N` ids, counting from 0 per kind.
#[derive(Debug, Default)]
pub(crate) struct MarkerIds {
    additions: usize,
    removals: usize,
}

impl MarkerIds {
    pub(crate) fn next(&mut self, kind: ChangeKind) -> String {
        let counter = match kind {
            ChangeKind::Addition => &mut self.additions,
            ChangeKind::Removal => &mut self.removals,
        };
        let id = format!("{}-{}", kind.id_prefix(), counter);
        *counter += 1;
        id
    }
}

/// Creates a detached marker span holding `text`.
pub(crate) fn create_marker(
    document: &mut Document,
    ids: &mut MarkerIds,
    kind: ChangeKind,
    text: &str,
) -> ChangeMarker {
    let change_id = ids.next(kind);
    let span = document.create(crate::document::NodeKind::element(
        "span",
        &[
            ("class", marker_class(kind)),
            (CHANGE_ID_ATTR, &change_id),
            (CHANGE_KIND_ATTR, kind.as_str()),
            (STATE_ATTR, MarkerState::Accepted.as_str()),
        ],
    ));
    document.append(span, crate::document::NodeKind::text(text));
    ChangeMarker {
        change_id,
        kind,
        text: text.to_string(),
        state: MarkerState::Accepted,
        node: span,
    }
}

/// `true` for elements whose text is never marked: raw text and existing markers.
pub(crate) fn is_unmarkable(document: &Document, id: NodeId) -> bool {
    matches!(document.element_name(id), Some("script" | "style"))
        || document.attr(id, CHANGE_ID_ATTR).is_some()
        || crate::document::normalize::is_hidden(document, id)
}
