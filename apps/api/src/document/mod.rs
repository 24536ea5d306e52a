// Document layer: arena HTML tree + text normalization.
// Everything above (diff, highlight, reconcile) works on these types.

pub mod normalize;
pub mod tree;

pub use normalize::{normalize, DocumentText};
pub use tree::{Document, NodeId, NodeKind};
