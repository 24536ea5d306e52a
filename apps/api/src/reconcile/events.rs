//! Typed toggle events and the iframe message format they are decoded from.

use serde::{Deserialize, Serialize};

use crate::diff::ChangeKind;
use crate::document::normalize;
use crate::highlight::{ChangeMarker, MarkerState, PhraseMatcher};

/// Sets one marker to `target`. Carrying the target state rather than "flip"
/// makes duplicate or late deliveries harmless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleEvent {
    pub change_id: String,
    pub kind: ChangeKind,
    pub target: MarkerState,
}

/// Message posted by the marker click bridge inside a rendered frame.
///
/// `state` is the marker state the frame showed when it was clicked; the
/// message asks for the opposite. A repeated delivery of the same click
/// therefore asks for the same target again and changes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    RemoveAddition {
        text: String,
        #[serde(rename = "changeId", default, skip_serializing_if = "Option::is_none")]
        change_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<MarkerState>,
    },
    RestoreRemoval {
        text: String,
        #[serde(rename = "changeId", default, skip_serializing_if = "Option::is_none")]
        change_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<MarkerState>,
    },
}

impl ClientMessage {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ClientMessage::RemoveAddition { .. } => ChangeKind::Addition,
            ClientMessage::RestoreRemoval { .. } => ChangeKind::Removal,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ClientMessage::RemoveAddition { text, .. } | ClientMessage::RestoreRemoval { text, .. } => text,
        }
    }

    pub fn change_id(&self) -> Option<&str> {
        match self {
            ClientMessage::RemoveAddition { change_id, .. }
            | ClientMessage::RestoreRemoval { change_id, .. } => change_id.as_deref(),
        }
    }

    /// State the frame displayed when the marker was clicked.
    pub fn observed_state(&self) -> Option<MarkerState> {
        match self {
            ClientMessage::RemoveAddition { state, .. }
            | ClientMessage::RestoreRemoval { state, .. } => *state,
        }
    }

    /// Resolves the message against `markers`, which must carry their
    /// current states.
    ///
    /// Frames may number their markers differently from the reconciler, so an
    /// id is only trusted when its marker text agrees with the message text.
    /// Otherwise every marker of the right kind with the same normalized text
    /// is targeted; failing that, every marker whose text appears as whole
    /// words inside the message text.
    ///
    /// Each targeted marker moves to the opposite of the observed state, or
    /// of its own current state when the frame did not report one.
    pub fn resolve(&self, markers: &[ChangeMarker]) -> Vec<ToggleEvent> {
        let kind = self.kind();
        let wanted = normalize(self.text());
        if wanted.is_empty() {
            return Vec::new();
        }
        let candidates: Vec<(&ChangeMarker, String)> = markers
            .iter()
            .filter(|m| m.kind == kind)
            .map(|m| (m, normalize(&m.text)))
            .collect();

        let by_id: Vec<&ChangeMarker> = match self.change_id() {
            Some(id) => candidates
                .iter()
                .filter(|(m, text)| m.change_id == id && *text == wanted)
                .map(|(m, _)| *m)
                .collect(),
            None => Vec::new(),
        };

        let targeted = if !by_id.is_empty() {
            by_id
        } else {
            let exact: Vec<&ChangeMarker> = candidates
                .iter()
                .filter(|(_, text)| *text == wanted)
                .map(|(m, _)| *m)
                .collect();
            if !exact.is_empty() {
                exact
            } else {
                candidates
                    .iter()
                    .filter(|(_, text)| {
                        !PhraseMatcher::in_order(std::slice::from_ref(text), true)
                            .find(&wanted)
                            .is_empty()
                    })
                    .map(|(m, _)| *m)
                    .collect()
            }
        };

        let observed = self.observed_state();
        targeted
            .into_iter()
            .map(|m| ToggleEvent {
                change_id: m.change_id.clone(),
                kind,
                target: observed.unwrap_or(m.state).toggled(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn marker(id: &str, kind: ChangeKind, text: &str) -> ChangeMarker {
        let mut document = Document::new();
        ChangeMarker {
            change_id: id.to_string(),
            kind,
            text: text.to_string(),
            state: MarkerState::Accepted,
            node: document.create(crate::document::NodeKind::text(text)),
        }
    }

    #[test]
    fn test_message_deserializes_from_frame_shape() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"removeAddition","text":"high-performance","changeId":"ins-0"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::RemoveAddition {
                text: "high-performance".into(),
                change_id: Some("ins-0".into()),
                state: None,
            }
        );

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"removeAddition","text":"Go","changeId":"ins-3","state":"rejected"}"#,
        )
        .unwrap();
        assert_eq!(msg.observed_state(), Some(MarkerState::Rejected));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"restoreRemoval","text":"legacy scripts"}"#).unwrap();
        assert_eq!(msg.kind(), ChangeKind::Removal);
        assert_eq!(msg.change_id(), None);
    }

    #[test]
    fn test_text_match_ignores_case_and_spacing() {
        let markers = vec![
            marker("ins-0", ChangeKind::Addition, "High-Performance "),
            marker("ins-1", ChangeKind::Addition, " system."),
            marker("del-0", ChangeKind::Removal, "high-performance "),
        ];
        let msg = ClientMessage::RemoveAddition {
            text: "high-performance".into(),
            change_id: None,
            state: None,
        };
        let events = msg.resolve(&markers);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].change_id, "ins-0");
        assert_eq!(events[0].target, MarkerState::Rejected);
    }

    #[test]
    fn test_mismatched_id_falls_back_to_text() {
        let markers = vec![
            marker("ins-0", ChangeKind::Addition, "Kubernetes "),
            marker("ins-1", ChangeKind::Addition, "Terraform "),
        ];
        // the frame numbered its markers differently
        let msg = ClientMessage::RemoveAddition {
            text: "Terraform".into(),
            change_id: Some("ins-0".into()),
            state: None,
        };
        let events = msg.resolve(&markers);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].change_id, "ins-1");
    }

    #[test]
    fn test_phrase_covering_several_markers() {
        let markers = vec![
            marker("del-0", ChangeKind::Removal, "Led "),
            marker("del-1", ChangeKind::Removal, " five"),
        ];
        let msg = ClientMessage::RestoreRemoval {
            text: "Led team of five".into(),
            change_id: None,
            state: None,
        };
        let ids: Vec<String> = msg
            .resolve(&markers)
            .into_iter()
            .map(|e| e.change_id)
            .collect();
        assert_eq!(ids, vec!["del-0", "del-1"]);
    }

    #[test]
    fn test_blank_message_targets_nothing() {
        let markers = vec![marker("ins-0", ChangeKind::Addition, "x")];
        let msg = ClientMessage::RemoveAddition {
            text: "  ".into(),
            change_id: None,
            state: None,
        };
        assert!(msg.resolve(&markers).is_empty());
    }

    #[test]
    fn test_containment_fallback_respects_word_boundaries() {
        let markers = vec![
            marker("ins-0", ChangeKind::Addition, "Rust "),
            marker("ins-1", ChangeKind::Addition, "partner"),
        ];
        let msg = ClientMessage::RemoveAddition {
            text: "Trusted partner network".into(),
            change_id: None,
            state: None,
        };
        let ids: Vec<String> = msg
            .resolve(&markers)
            .into_iter()
            .map(|e| e.change_id)
            .collect();
        assert_eq!(ids, vec!["ins-1"]);
    }

    #[test]
    fn test_target_is_opposite_of_observed_state() {
        let mut rejected = marker("ins-0", ChangeKind::Addition, "Kafka");
        rejected.state = MarkerState::Rejected;
        let markers = vec![rejected];

        let unreported = ClientMessage::RemoveAddition {
            text: "Kafka".into(),
            change_id: Some("ins-0".into()),
            state: None,
        };
        assert_eq!(unreported.resolve(&markers)[0].target, MarkerState::Accepted);

        // a stale frame still showing the marker as accepted
        let stale = ClientMessage::RemoveAddition {
            text: "Kafka".into(),
            change_id: Some("ins-0".into()),
            state: Some(MarkerState::Accepted),
        };
        assert_eq!(stale.resolve(&markers)[0].target, MarkerState::Rejected);
    }
}
