//! Keyword selection engine: initial highlighting of backend keywords, user
//! edits (add / delete / reclassify / drag-select) and the final lists sent to
//! the rewrite job.

pub mod engine;
pub mod model;
pub mod selection;

pub use engine::KeywordSelectionEngine;
pub use model::{Keyword, KeywordEvent, KeywordSelection, Segment};
pub use selection::{BoundingBoxLines, DragSelection, LineGrouping, SingleLine};
