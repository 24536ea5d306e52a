use tracing::debug;

use crate::diff::{ChangeKind, ChangePhrase};
use crate::document::{Document, NodeId, NodeKind};
use crate::highlight::assets::{HIGHLIGHT_SCRIPT, HIGHLIGHT_STYLE, SCRIPT_ID, STYLE_ID};
use crate::highlight::matcher::PhraseMatcher;
use crate::highlight::{create_marker, is_unmarkable, ChangeMarker, MarkerIds, RenderedDocument};

/// Marks every added phrase in the rewritten document.
pub fn render_additions(rewritten_html: &str, additions: &[ChangePhrase]) -> RenderedDocument {
    render_phrases(rewritten_html, additions, ChangeKind::Addition)
}

/// Marks every removed phrase in the original document.
pub fn render_removals(original_html: &str, removals: &[ChangePhrase]) -> RenderedDocument {
    render_phrases(original_html, removals, ChangeKind::Removal)
}

fn render_phrases(html: &str, phrases: &[ChangePhrase], kind: ChangeKind) -> RenderedDocument {
    let mut document = Document::parse(html);
    let texts: Vec<String> = phrases.iter().map(|p| p.text.clone()).collect();
    let matcher = PhraseMatcher::longest_first(&texts);

    let mut ids = MarkerIds::default();
    let mut markers = Vec::new();
    let mut placed = vec![false; phrases.len()];

    let nodes = document.text_nodes_where(|id| !is_unmarkable(&document, id));
    for node in nodes {
        let Some(text) = document.text(node).map(str::to_owned) else {
            continue;
        };
        let claims = matcher.find(&text);
        if claims.is_empty() {
            continue;
        }

        let mut pieces: Vec<NodeId> = Vec::with_capacity(claims.len() * 2 + 1);
        let mut cursor = 0;
        for claim in &claims {
            if claim.start > cursor {
                pieces.push(document.create(NodeKind::text(&text[cursor..claim.start])));
            }
            let marker = create_marker(&mut document, &mut ids, kind, &text[claim.start..claim.end]);
            pieces.push(marker.node);
            markers.push(marker);
            placed[claim.phrase] = true;
            cursor = claim.end;
        }
        if cursor < text.len() {
            pieces.push(document.create(NodeKind::text(&text[cursor..])));
        }
        document.replace_with(node, &pieces);
    }

    inject_assets(&mut document);

    let unplaced: Vec<ChangePhrase> = phrases
        .iter()
        .zip(&placed)
        .filter(|(_, &placed)| !placed)
        .map(|(p, _)| p.clone())
        .collect();
    debug!(
        kind = kind.as_str(),
        phrases = phrases.len(),
        markers = markers.len(),
        unplaced = unplaced.len(),
        "Rendered highlights"
    );

    RenderedDocument {
        document,
        markers,
        unplaced,
    }
}

/// Adds the marker stylesheet to `<head>` and the click bridge to the end of
/// `<body>`. Running it twice changes nothing.
pub fn inject_assets(document: &mut Document) {
    if document.find_by_attr("id", STYLE_ID).is_none() {
        let head = document
            .find_element("head")
            .unwrap_or_else(|| document.root());
        let style = document.append(head, NodeKind::element("style", &[("id", STYLE_ID)]));
        document.append(style, NodeKind::text(HIGHLIGHT_STYLE));
    }
    if document.find_by_attr("id", SCRIPT_ID).is_none() {
        let body = document
            .find_element("body")
            .unwrap_or_else(|| document.root());
        let script = document.append(body, NodeKind::element("script", &[("id", SCRIPT_ID)]));
        document.append(script, NodeKind::text(HIGHLIGHT_SCRIPT));
    }
}

/// Removes the nodes added by `inject_assets`.
pub fn strip_assets(document: &mut Document) {
    for id in [STYLE_ID, SCRIPT_ID] {
        if let Some(node) = document.find_by_attr("id", id) {
            document.detach(node);
        }
    }
}

/// Markers present in `document`, in document order.
pub fn collect_markers(document: &Document) -> Vec<ChangeMarker> {
    use crate::highlight::{MarkerState, CHANGE_ID_ATTR, CHANGE_KIND_ATTR, STATE_ATTR};

    document
        .descendants(document.root())
        .into_iter()
        .filter_map(|id| {
            let change_id = document.attr(id, CHANGE_ID_ATTR)?;
            let kind = match document.attr(id, CHANGE_KIND_ATTR)? {
                "addition" => ChangeKind::Addition,
                "removal" => ChangeKind::Removal,
                _ => return None,
            };
            let state = match document.attr(id, STATE_ATTR) {
                Some("rejected") => MarkerState::Rejected,
                _ => MarkerState::Accepted,
            };
            Some(ChangeMarker {
                change_id: change_id.to_string(),
                kind,
                text: document.text_content(id),
                state,
                node: id,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff;

    fn phrase(text: &str, kind: ChangeKind) -> ChangePhrase {
        ChangePhrase::new(text.to_string(), kind, (0, 0))
    }

    fn body(document: &Document) -> String {
        let mut document = document.clone();
        strip_assets(&mut document);
        let body = document.find_element("body").unwrap();
        document.inner_html(body)
    }

    #[test]
    fn test_additions_are_wrapped_in_marker_spans() {
        let original = "<html><body><p>Built a cache.</p></body></html>";
        let rewritten = "<html><body><p>Built a high-performance cache system.</p></body></html>";
        let result = diff::diff(original, rewritten);
        let rendered = render_additions(rewritten, &result.additions);

        assert_eq!(rendered.markers.len(), 2);
        assert_eq!(rendered.markers[0].change_id, "ins-0");
        assert_eq!(rendered.markers[0].text, "high-performance");
        let html = body(&rendered.document);
        assert!(html.contains(
            "<span class=\"change-highlight-add\" data-change-id=\"ins-0\" data-change-kind=\"addition\" data-state=\"accepted\">high-performance</span>"
        ));
        assert!(rendered.unplaced.is_empty());
    }

    #[test]
    fn test_untouched_text_nodes_are_not_wrapped() {
        let html = "<body><p>Summary</p><p>Built a cache</p></body>";
        let rendered = render_additions(html, &[phrase("cache", ChangeKind::Addition)]);
        let out = body(&rendered.document);
        assert!(out.starts_with("<p>Summary</p>"));
        assert_eq!(rendered.markers.len(), 1);
    }

    #[test]
    fn test_markers_never_nest_or_overlap() {
        let html = "<body><p>distributed cache layer, cache</p></body>";
        let rendered = render_removals(
            html,
            &[
                phrase("cache", ChangeKind::Removal),
                phrase("distributed cache layer", ChangeKind::Removal),
            ],
        );
        assert_eq!(rendered.markers.len(), 2);
        assert_eq!(rendered.markers[0].text, "distributed cache layer");
        assert_eq!(rendered.markers[1].text, "cache");
        for marker in &rendered.markers {
            let parent = rendered.document.parent(marker.node).unwrap();
            assert_eq!(rendered.document.element_name(parent), Some("p"));
        }
    }

    #[test]
    fn test_script_and_style_are_skipped() {
        let html = "<html><head><style>.cache{}</style></head><body><script>var cache;</script><p>cache</p></body></html>";
        let rendered = render_additions(html, &[phrase("cache", ChangeKind::Addition)]);
        assert_eq!(rendered.markers.len(), 1);
        let out = rendered.html();
        assert!(out.contains("<style>.cache{}</style>"));
        assert!(out.contains("<script>var cache;</script>"));
    }

    #[test]
    fn test_assets_are_injected_once() {
        let mut rendered = render_additions("<p>x</p>", &[]);
        inject_assets(&mut rendered.document);
        let html = rendered.html();
        assert_eq!(html.matches(STYLE_ID).count(), 1);
        assert_eq!(html.matches(SCRIPT_ID).count(), 1);
        assert!(html.contains("removeAddition"));
    }

    #[test]
    fn test_rejected_insertions_are_hidden() {
        let html = render_additions("<p>x</p>", &[]).html();
        assert!(html.contains(r#".change-highlight-add[data-state="rejected"] { display: none; }"#));
        assert!(html.contains("state: state"));
    }

    #[test]
    fn test_unmatched_phrase_is_reported() {
        let rendered = render_removals(
            "<body><p>Led <b>team</b> of five</p></body>",
            &[phrase("Led team", ChangeKind::Removal)],
        );
        assert!(rendered.markers.is_empty());
        assert_eq!(rendered.unplaced.len(), 1);
    }

    #[test]
    fn test_collect_markers_reads_back_rendered_spans() {
        let rendered = render_additions(
            "<body><p>Rust and Go</p></body>",
            &[phrase("Rust", ChangeKind::Addition), phrase("Go", ChangeKind::Addition)],
        );
        let reparsed = Document::parse(&rendered.html());
        let markers = collect_markers(&reparsed);
        let ids: Vec<&str> = markers.iter().map(|m| m.change_id.as_str()).collect();
        assert_eq!(ids, vec!["ins-0", "ins-1"]);
        assert_eq!(markers[1].text, "Go");
    }
}
