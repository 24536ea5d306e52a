//! Change reconciler: tracks accept/reject decisions over an annotated
//! document and rebuilds the final résumé from them.
//!
//! The state map is replaced wholesale on every mutation, so a reader holding
//! a previous snapshot (e.g. a serialized session view) never sees it change.

pub mod events;

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::diff::ChangeKind;
use crate::document::Document;
use crate::highlight::render::strip_assets;
use crate::highlight::{ChangeMarker, MarkerState, RenderedDocument, STATE_ATTR};

pub use events::{ClientMessage, ToggleEvent};

static XMLNS_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\s+xmlns(?::[\w.-]+)?="[^"]*""#).unwrap());
static PREFIXED_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(/?)a\d+:").unwrap());
static PREFIXED_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\s)a\d+:([\w-]+=)").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("unknown change id '{0}'")]
    UnknownChange(String),
    #[error("change '{id}' is not a {expected:?}")]
    KindMismatch { id: String, expected: ChangeKind },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledDocument {
    pub html: String,
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub additions_accepted: usize,
    pub additions_rejected: usize,
    pub removals_accepted: usize,
    pub removals_rejected: usize,
}

#[derive(Debug, Clone)]
pub struct ChangeReconciler {
    template: Document,
    annotated: Document,
    markers: Vec<ChangeMarker>,
    states: BTreeMap<String, MarkerState>,
}

impl ChangeReconciler {
    /// `template_html` supplies everything outside `<body>` of the final
    /// document; `rendered` supplies the body and its markers.
    pub fn new(template_html: &str, rendered: RenderedDocument) -> Self {
        let states = rendered
            .markers
            .iter()
            .map(|m| (m.change_id.clone(), m.state))
            .collect();
        Self {
            template: Document::parse(template_html),
            annotated: rendered.document,
            markers: rendered.markers,
            states,
        }
    }

    /// Markers with their current states, in document order.
    pub fn markers(&self) -> Vec<ChangeMarker> {
        self.markers
            .iter()
            .map(|m| ChangeMarker {
                state: self.state_of(&m.change_id),
                ..m.clone()
            })
            .collect()
    }

    pub fn state(&self, change_id: &str) -> Option<MarkerState> {
        self.states.get(change_id).copied()
    }

    fn state_of(&self, change_id: &str) -> MarkerState {
        self.state(change_id).unwrap_or_default()
    }

    fn marker(&self, change_id: &str) -> Result<&ChangeMarker, ReconcileError> {
        self.markers
            .iter()
            .find(|m| m.change_id == change_id)
            .ok_or_else(|| ReconcileError::UnknownChange(change_id.to_string()))
    }

    /// Flips one marker and returns its new state.
    pub fn toggle(&mut self, change_id: &str) -> Result<MarkerState, ReconcileError> {
        self.marker(change_id)?;
        let next = self.state_of(change_id).toggled();
        self.set_state(change_id, next)?;
        Ok(next)
    }

    /// Returns `true` when the state actually changed.
    pub fn set_state(&mut self, change_id: &str, state: MarkerState) -> Result<bool, ReconcileError> {
        let node = self.marker(change_id)?.node;
        if self.state(change_id) == Some(state) {
            return Ok(false);
        }

        let mut next = self.states.clone();
        next.insert(change_id.to_string(), state);
        self.states = next;
        self.annotated.set_attr(node, STATE_ATTR, state.as_str());
        debug!(change_id, state = state.as_str(), "Change state updated");
        Ok(true)
    }

    pub fn apply(&mut self, event: &ToggleEvent) -> Result<bool, ReconcileError> {
        let marker = self.marker(&event.change_id)?;
        if marker.kind != event.kind {
            return Err(ReconcileError::KindMismatch {
                id: event.change_id.clone(),
                expected: event.kind,
            });
        }
        self.set_state(&event.change_id, event.target)
    }

    /// Applies a frame message; returns how many markers changed.
    pub fn apply_message(&mut self, message: &ClientMessage) -> usize {
        let events = message.resolve(&self.markers());
        if events.is_empty() {
            debug!(text = message.text(), "Frame message matched no marker");
        }
        events
            .iter()
            .filter(|event| matches!(self.apply(event), Ok(true)))
            .count()
    }

    pub fn accept_all(&mut self) {
        self.set_all(MarkerState::Accepted);
    }

    pub fn reject_all(&mut self) {
        self.set_all(MarkerState::Rejected);
    }

    fn set_all(&mut self, state: MarkerState) {
        let next: BTreeMap<String, MarkerState> = self
            .markers
            .iter()
            .map(|m| (m.change_id.clone(), state))
            .collect();
        for marker in &self.markers {
            self.annotated.set_attr(marker.node, STATE_ATTR, state.as_str());
        }
        self.states = next;
    }

    pub fn summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        for marker in &self.markers {
            let slot = match (marker.kind, self.state_of(&marker.change_id)) {
                (ChangeKind::Addition, MarkerState::Accepted) => &mut summary.additions_accepted,
                (ChangeKind::Addition, MarkerState::Rejected) => &mut summary.additions_rejected,
                (ChangeKind::Removal, MarkerState::Accepted) => &mut summary.removals_accepted,
                (ChangeKind::Removal, MarkerState::Rejected) => &mut summary.removals_rejected,
            };
            *slot += 1;
        }
        summary
    }

    /// The annotated document with current `data-state` attributes.
    pub fn annotated_html(&self) -> String {
        self.annotated.to_html()
    }

    /// Builds the final document. Pure: calling it repeatedly with the same
    /// states yields the same HTML.
    pub fn reconstruct(&self) -> ReconciledDocument {
        let mut working = self.annotated.clone();
        strip_assets(&mut working);

        let (mut accepted, mut rejected) = (0, 0);
        for marker in &self.markers {
            let state = self.state_of(&marker.change_id);
            match state {
                MarkerState::Accepted => accepted += 1,
                MarkerState::Rejected => rejected += 1,
            }

            if working.text_content(marker.node).trim().chars().count() <= 1 {
                working.detach(marker.node);
                continue;
            }
            let keep_text = matches!(
                (marker.kind, state),
                (ChangeKind::Addition, MarkerState::Accepted) | (ChangeKind::Removal, MarkerState::Rejected)
            );
            if keep_text {
                working.unwrap_node(marker.node);
            } else {
                working.detach(marker.node);
            }
        }

        let mut output = self.template.clone();
        strip_assets(&mut output);
        match (output.find_element("body"), working.find_element("body")) {
            (Some(target), Some(source)) => {
                for child in output.children(target).to_vec() {
                    output.detach(child);
                }
                for &child in working.children(source) {
                    output.import_subtree(&working, child, target);
                }
            }
            _ => output = working,
        }

        ReconciledDocument {
            html: strip_namespace_artifacts(&output.to_html()),
            accepted,
            rejected,
        }
    }
}

/// Drops XHTML namespace declarations and generated `a0:`-style prefixes.
pub fn strip_namespace_artifacts(html: &str) -> String {
    let html = XMLNS_ATTR.replace_all(html, "");
    let html = PREFIXED_TAG.replace_all(&html, "<$1");
    PREFIXED_ATTR.replace_all(&html, "$1$2").into_owned()
}
