//! Plain-text extraction and normalization for résumé HTML.
//!
//! Everything here is pure: no I/O, no panics on malformed input.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::tree::{Document, NodeId, NodeKind};

/// Subtrees whose text never renders.
pub const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "head", "template", "noscript", "title"];

/// Elements that start a new line of text; a space is inserted at their edges so
/// adjacent paragraphs do not fuse into one word.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot", "th",
    "thead", "tr", "ul",
];

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[A-Za-z/!][^>]*>").unwrap());

// Line-level markers run first so a `* item` bullet is never read as emphasis.
static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]+").unwrap());
static BLOCKQUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]{0,3}>[ \t]?").unwrap());
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*+][ \t]+").unwrap());
static ORDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]+").unwrap());
static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").unwrap());
static BOLD_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static BOLD_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.+?)__").unwrap());
static ITALIC_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*").unwrap());
static ITALIC_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\w])_([^_\s](?:[^_]*[^_\s])?)_([^\w]|$)").unwrap());
static STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~(.+?)~~").unwrap());
static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`{1,3}([^`]*)`{1,3}").unwrap());

/// A word of extracted text and, when it came from a parsed tree, where it lives.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub index: usize,
    pub location: Option<WordLocation>,
}

/// Byte range of a word inside one text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordLocation {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

/// Plain text derived from an HTML document. Recomputed whenever the source
/// changes; never edited in place.
#[derive(Debug, Clone, Default)]
pub struct DocumentText {
    pub raw: String,
    pub normalized: String,
    /// Whitespace-delimited tokens, punctuation retained. Tokenized per text
    /// node, so every word maps to exactly one location in the tree.
    pub words: Vec<Word>,
}

impl DocumentText {
    pub fn from_html(html: &str) -> Self {
        if html.trim().is_empty() {
            return Self::default();
        }
        Self::from_document(&Document::parse(html))
    }

    pub fn from_document(document: &Document) -> Self {
        let raw = document_text(document);
        let normalized = normalize(&raw);

        let mut words = Vec::new();
        for node in document.text_nodes_where(|id| !is_hidden(document, id)) {
            let Some(text) = document.text(node) else {
                continue;
            };
            for (start, token) in split_tokens(text) {
                words.push(Word {
                    text: token.to_string(),
                    index: words.len(),
                    location: Some(WordLocation {
                        node,
                        start,
                        end: start + token.len(),
                    }),
                });
            }
        }

        Self {
            raw,
            normalized,
            words,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Visible text of an HTML fragment, whitespace runs collapsed, trimmed.
pub fn extract_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    document_text(&Document::parse(html))
}

/// `extract_text` for input that may or may not be markup. Text without tags
/// is returned unchanged, line breaks included.
pub fn visible_text(text: &str) -> String {
    if MARKUP.is_match(text) {
        extract_text(text)
    } else {
        text.to_string()
    }
}

/// Visible text of an already parsed document.
pub fn document_text(document: &Document) -> String {
    let mut out = String::new();
    collect_text(document, document.root(), &mut out);
    collapse_whitespace(&out)
}

fn collect_text(document: &Document, id: NodeId, out: &mut String) {
    match document.kind(id) {
        NodeKind::Text(text) => out.push_str(text),
        NodeKind::Element { name, .. } => {
            if HIDDEN_ELEMENTS.contains(&name.as_str()) {
                return;
            }
            let block = BLOCK_ELEMENTS.contains(&name.as_str());
            if block {
                out.push(' ');
            }
            for &child in document.children(id) {
                collect_text(document, child, out);
            }
            if block {
                out.push(' ');
            }
        }
        NodeKind::Document => {
            for &child in document.children(id) {
                collect_text(document, child, out);
            }
        }
        _ => {}
    }
}

pub(crate) fn is_hidden(document: &Document, id: NodeId) -> bool {
    document
        .element_name(id)
        .map(|name| HIDDEN_ELEMENTS.contains(&name))
        .unwrap_or(false)
}

/// Removes markdown decoration, keeping the enclosed literal text.
pub fn strip_markdown(text: &str) -> String {
    let text = HEADER.replace_all(text, "");
    let text = BLOCKQUOTE.replace_all(&text, "");
    let text = BULLET.replace_all(&text, "");
    let text = ORDINAL.replace_all(&text, "");
    let text = IMAGE.replace_all(&text, "$1");
    let text = LINK.replace_all(&text, "$1");
    let text = BOLD_STAR.replace_all(&text, "$1");
    let text = BOLD_UNDERSCORE.replace_all(&text, "$1");
    let text = ITALIC_STAR.replace_all(&text, "$1");
    let text = ITALIC_UNDERSCORE.replace_all(&text, "${1}${2}${3}");
    let text = STRIKE.replace_all(&text, "$1");
    let text = CODE.replace_all(&text, "$1");
    text.into_owned()
}

/// `strip_markdown`, lowercase, collapse whitespace, trim.
pub fn normalize(text: &str) -> String {
    collapse_whitespace(&strip_markdown(text).to_lowercase())
}

/// Comparison key for a single word: normalized, surrounding punctuation removed.
pub fn normalize_word(word: &str) -> String {
    normalize(word)
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-delimited tokens with their byte offsets.
pub fn split_tokens(text: &str) -> Vec<(usize, &str)> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                tokens.push((s, &text[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push((s, &text[s..]));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_collapses_whitespace() {
        let text = extract_text("<body><p>Built   a\n\n cache.</p>\n<p>Shipped it.</p></body>");
        assert_eq!(text, "Built a cache. Shipped it.");
    }

    #[test]
    fn test_visible_text_only_parses_markup() {
        assert_eq!(
            visible_text("<ul><li>Python</li><li>SQL &amp; dbt</li></ul>"),
            "Python SQL & dbt"
        );
        let plain = "5+ years < 10 people\nPython";
        assert_eq!(visible_text(plain), plain);
    }

    #[test]
    fn test_extract_text_skips_script_and_style() {
        let text = extract_text(
            "<html><head><title>T</title><style>p{}</style></head><body><p>Hi</p><script>var x = '<b>';</script></body></html>",
        );
        assert_eq!(text, "Hi");
    }

    #[test]
    fn test_extract_text_has_no_tag_artifacts() {
        for html in [
            "<div><p>one</p><ul><li>two</li><li>three</li></ul></div>",
            "<p>unclosed <b>bold <i>mix</p>",
            "<table><tr><td>cell</td><td>next</td></tr></table>",
            "plain text only",
        ] {
            let text = extract_text(html);
            assert!(!text.contains('<') && !text.contains('>'), "{text}");
            assert!(!text.contains("  "), "{text}");
            assert_eq!(text, text.trim());
        }
    }

    #[test]
    fn test_extract_text_empty_input() {
        assert_eq!(extract_text(""), "");
        assert_eq!(extract_text("   \n"), "");
    }

    #[test]
    fn test_adjacent_blocks_do_not_fuse() {
        let text = extract_text("<ul><li>Rust</li><li>Go</li></ul>");
        assert_eq!(text, "Rust Go");
    }

    #[test]
    fn test_strip_markdown_bold_keeps_text() {
        assert_eq!(strip_markdown("**Led** team"), "Led team");
    }

    #[test]
    fn test_strip_markdown_bold_before_italic() {
        assert_eq!(strip_markdown("**bold** and *italic*"), "bold and italic");
        assert_eq!(strip_markdown("__bold__ and _italic_"), "bold and italic");
    }

    #[test]
    fn test_strip_markdown_block_markers() {
        let md = "# Title\n> quoted\n- bullet\n* star\n+ plus\n12. ordinal";
        assert_eq!(
            strip_markdown(md),
            "Title\nquoted\nbullet\nstar\nplus\nordinal"
        );
    }

    #[test]
    fn test_strip_markdown_links_images_code_strike() {
        assert_eq!(
            strip_markdown("see [docs](http://x) ![logo](a.png) `cargo` ~~old~~"),
            "see docs logo cargo old"
        );
    }

    #[test]
    fn test_strip_markdown_leaves_arithmetic_alone() {
        assert_eq!(strip_markdown("5 * 3 * 2"), "5 * 3 * 2");
    }

    #[test]
    fn test_normalize_lowercases_and_trims() {
        assert_eq!(normalize("  **Led**   the\tTEAM  "), "led the team");
    }

    #[test]
    fn test_normalize_word_strips_punctuation() {
        assert_eq!(normalize_word("Cache."), "cache");
        assert_eq!(normalize_word("(**Rust**),"), "rust");
        assert_eq!(normalize_word("high-performance"), "high-performance");
    }

    #[test]
    fn test_split_tokens_offsets() {
        let tokens = split_tokens("  ab cd\n e");
        assert_eq!(tokens, vec![(2, "ab"), (5, "cd"), (9, "e")]);
    }

    #[test]
    fn test_document_text_words_have_locations() {
        let text = DocumentText::from_html("<body><p>Built a <b>fast</b> cache.</p></body>");
        let words: Vec<&str> = text.words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(words, vec!["Built", "a", "fast", "cache."]);
        assert!(text.words.iter().all(|w| w.location.is_some()));
        assert_eq!(text.raw, "Built a fast cache.");
        assert_eq!(text.normalized, "built a fast cache.");
    }
}
