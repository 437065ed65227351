//! Editable-surface classification.
//!
//! Text areas and text-like inputs address their content by linear char
//! offsets (`selectionStart` / `selectionEnd`). Everything else, including
//! `contenteditable` regions, is addressed through a [`TextRange`](crate::surface::TextRange).

use crate::surface::{NodeId, NodeKind, Surface};

/// Input types whose value is plain, linearly addressable text
const TEXT_INPUT_TYPES: &[&str] = &[
    "text", "search", "email", "url", "tel", "password", "number",
];

/// Whether a node of this kind supports offset addressing
pub fn supports_offsets(kind: &NodeKind) -> bool {
    match kind {
        NodeKind::TextArea => true,
        NodeKind::Input { input_type } => match input_type.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(input_type) => TEXT_INPUT_TYPES
                .iter()
                .any(|known| known.eq_ignore_ascii_case(input_type)),
        },
        // contenteditable regions fall through to range addressing
        NodeKind::Element { .. } | NodeKind::Text => false,
    }
}

/// Whether `node` is a text-entry control with offset addressing.
/// Absent or unknown nodes are not.
pub fn is_offset_addressable<S: Surface + ?Sized>(surface: &S, node: Option<NodeId>) -> bool {
    node.and_then(|node| surface.node_kind(node))
        .is_some_and(|kind| supports_offsets(&kind))
}
