//! Drag selection over selectable word segments.
//!
//! Layout lives in the browser, so "same line" is answered by a
//! `LineGrouping` built from what the client reports about its spans.

use std::collections::HashMap;

use crate::keywords::engine::KeywordSelectionEngine;

/// Default vertical tolerance, in CSS pixels, for two spans to share a line.
pub const LINE_TOLERANCE_PX: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineGroup(pub i64);

pub trait LineGrouping {
    fn line_of(&self, index: usize) -> Option<LineGroup>;

    fn same_line(&self, a: usize, b: usize) -> bool {
        match (self.line_of(a), self.line_of(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }
}

/// Every span on one line; used when the client sends no geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleLine;

impl LineGrouping for SingleLine {
    fn line_of(&self, _index: usize) -> Option<LineGroup> {
        Some(LineGroup(0))
    }
}

/// Spans share a line when their bounding-box tops are within `tolerance`.
#[derive(Debug, Clone, Default)]
pub struct BoundingBoxLines {
    tops: HashMap<usize, f64>,
    tolerance: f64,
}

impl BoundingBoxLines {
    pub fn new(tops: HashMap<usize, f64>) -> Self {
        Self::with_tolerance(tops, LINE_TOLERANCE_PX)
    }

    pub fn with_tolerance(tops: HashMap<usize, f64>, tolerance: f64) -> Self {
        Self { tops, tolerance }
    }
}

impl LineGrouping for BoundingBoxLines {
    fn line_of(&self, index: usize) -> Option<LineGroup> {
        let top = self.tops.get(&index)?;
        let band = if self.tolerance > 0.0 { self.tolerance } else { 1.0 };
        Some(LineGroup((top / band).round() as i64))
    }

    fn same_line(&self, a: usize, b: usize) -> bool {
        match (self.tops.get(&a), self.tops.get(&b)) {
            (Some(x), Some(y)) => (x - y).abs() <= self.tolerance,
            _ => false,
        }
    }
}

/// A selection in progress, anchored where the pointer went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSelection {
    anchor: usize,
    head: usize,
}

impl DragSelection {
    /// Starts a selection on a selectable word; `None` anywhere else.
    pub fn begin(engine: &KeywordSelectionEngine, index: usize) -> Option<Self> {
        engine.is_word(index).then_some(Self {
            anchor: index,
            head: index,
        })
    }

    /// Moves the head to `index` if that word is reachable from the anchor
    /// without crossing a keyword marker or leaving the anchor's line.
    /// Returns whether the head moved.
    pub fn extend(
        &mut self,
        engine: &KeywordSelectionEngine,
        lines: &dyn LineGrouping,
        index: usize,
    ) -> bool {
        if !engine.is_word(index) || !lines.same_line(self.anchor, index) {
            return false;
        }
        let (lo, hi) = ordered(self.anchor, index);
        if (lo..=hi).any(|i| engine.is_marker(i)) {
            return false;
        }
        self.head = index;
        true
    }

    /// Pointer moved straight to `target`: walks toward it one word at a
    /// time and stops at the last reachable word.
    pub fn drag_to(
        &mut self,
        engine: &KeywordSelectionEngine,
        lines: &dyn LineGrouping,
        target: usize,
    ) {
        let forward = target >= self.anchor;
        let mut i = self.anchor;
        while i != target {
            i = if forward { i + 1 } else { i.wrapping_sub(1) };
            if i >= engine.segments().len() || engine.is_marker(i) {
                break;
            }
            if engine.is_word(i) && !self.extend(engine, lines, i) {
                break;
            }
        }
    }

    /// Selected segment range, inclusive, in text order.
    pub fn range(&self) -> (usize, usize) {
        ordered(self.anchor, self.head)
    }

    /// Pointer released: commits the selection as a new keyword.
    pub fn finish(self, engine: &mut KeywordSelectionEngine) -> Option<String> {
        let (lo, hi) = self.range();
        engine.commit_selection(lo, hi)
    }
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::model::KeywordSelection;

    fn engine(text: &str, keywords: &[&str]) -> KeywordSelectionEngine {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_string()).collect();
        KeywordSelectionEngine::initial(text, &keywords, &KeywordSelection::default())
    }

    #[test]
    fn test_begin_requires_a_word() {
        let engine = engine("alpha beta", &["beta"]);
        assert!(DragSelection::begin(&engine, 0).is_some());
        assert!(DragSelection::begin(&engine, 1).is_none()); // gap
        assert!(DragSelection::begin(&engine, 2).is_none()); // marker
    }

    #[test]
    fn test_drag_and_finish_creates_keyword() {
        let mut engine = engine("strong written communication skills", &[]);
        let mut selection = DragSelection::begin(&engine, 2).unwrap();
        selection.drag_to(&engine, &SingleLine, 4);
        assert_eq!(selection.range(), (2, 4));
        assert_eq!(
            selection.finish(&mut engine),
            Some("written communication".to_string())
        );
        assert_eq!(engine.finalize().keyword_final, vec!["written communication"]);
    }

    #[test]
    fn test_drag_stops_at_existing_marker() {
        // segments: distributed(0) _ systems(2) _ Kafka(4) _ streaming(6)
        let engine = engine("distributed systems Kafka streaming", &["Kafka"]);
        let mut selection = DragSelection::begin(&engine, 0).unwrap();
        selection.drag_to(&engine, &SingleLine, 6);
        assert_eq!(selection.range(), (0, 2));
        assert!(!selection.extend(&engine, &SingleLine, 6));
    }

    #[test]
    fn test_drag_backwards() {
        let engine = engine("one two three", &[]);
        let mut selection = DragSelection::begin(&engine, 4).unwrap();
        selection.drag_to(&engine, &SingleLine, 0);
        assert_eq!(selection.range(), (0, 4));
    }

    #[test]
    fn test_selection_stays_on_anchor_line() {
        let engine = engine("one two three", &[]);
        let tops = HashMap::from([(0, 100.0), (2, 103.5), (4, 122.0)]);
        let lines = BoundingBoxLines::new(tops);
        let mut selection = DragSelection::begin(&engine, 0).unwrap();
        selection.drag_to(&engine, &lines, 4);
        assert_eq!(selection.range(), (0, 2));
    }

    #[test]
    fn test_bounding_box_tolerance() {
        let lines = BoundingBoxLines::new(HashMap::from([(0, 10.0), (1, 14.9), (2, 15.5)]));
        assert!(lines.same_line(0, 1));
        assert!(!lines.same_line(0, 2));
        assert!(!lines.same_line(0, 9));
    }
}
