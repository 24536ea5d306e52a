// Stylesheets and the click bridge injected into rendered documents.

pub const STYLE_ID: &str = "change-highlight-style";
pub const SCRIPT_ID: &str = "change-highlight-script";

pub const HIGHLIGHT_STYLE: &str = r#"
.change-highlight-add, .change-highlight-remove {
  cursor: pointer;
  border-radius: 2px;
  transition: background-color 0.15s ease-in-out;
}
.change-highlight-add { background-color: rgba(34, 197, 94, 0.25); }
.change-highlight-add:hover { background-color: rgba(34, 197, 94, 0.45); }
.change-highlight-add[data-state="rejected"] { display: none; }
.change-highlight-remove {
  background-color: rgba(239, 68, 68, 0.2);
  text-decoration: line-through;
  color: #b91c1c;
}
.change-highlight-remove:hover { background-color: rgba(239, 68, 68, 0.35); }
.change-highlight-remove[data-state="rejected"] {
  background-color: rgba(245, 158, 11, 0.25);
  text-decoration: none;
  color: inherit;
}
"#;

/// Posts `{type, text, changeId, state}` to the parent frame when a marker is
/// clicked, then flips the marker's `data-state` locally.
pub const HIGHLIGHT_SCRIPT: &str = r#"
(function () {
  document.addEventListener('click', function (event) {
    var target = event.target;
    var marker = target && target.closest ? target.closest('[data-change-id]') : null;
    if (!marker || !window.parent) { return; }
    event.preventDefault();
    var kind = marker.getAttribute('data-change-kind');
    var state = marker.getAttribute('data-state') || 'accepted';
    window.parent.postMessage({
      type: kind === 'addition' ? 'removeAddition' : 'restoreRemoval',
      text: (marker.textContent || '').trim(),
      changeId: marker.getAttribute('data-change-id'),
      state: state
    }, '*');
    marker.setAttribute('data-state', state === 'accepted' ? 'rejected' : 'accepted');
  });
})();
"#;

/// Styles for the keyword selection view: orange keywords, green focus terms.
pub const KEYWORD_STYLE: &str = r#"
.kw-selectable { cursor: text; border-radius: 2px; }
.kw-selectable.kw-selecting { background-color: rgba(59, 130, 246, 0.25); }
.kw-marker { padding: 0 2px; border-radius: 3px; cursor: pointer; }
.kw-keyword { background-color: rgba(249, 115, 22, 0.3); border-bottom: 2px solid #f97316; }
.kw-focus { background-color: rgba(34, 197, 94, 0.3); border-bottom: 2px solid #22c55e; }
"#;
