//! Checks that stop a rewrite before it is dispatched.

use crate::surface::{NodeId, Surface, TextRange};

/// Zero-width chars that make an otherwise empty selection look non-empty
const INVISIBLE_CHARS: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Literal values that are placeholders rather than content
const PLACEHOLDERS: &[&str] = &["none", "null", "undefined", "n/a"];

/// Whether `text` is worth sending to the rewriting service
pub fn is_meaningful_content(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    let visible: String = trimmed
        .chars()
        .filter(|c| !INVISIBLE_CHARS.contains(c))
        .collect();
    if visible.is_empty() {
        return false;
    }
    !PLACEHOLDERS
        .iter()
        .any(|placeholder| placeholder.eq_ignore_ascii_case(&visible))
}

/// The polisher's own UI on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolControls {
    /// Floating trigger button
    pub trigger: NodeId,
    /// Result overlay, once it has been created
    pub overlay: Option<NodeId>,
}

impl ToolControls {
    pub fn new(trigger: NodeId) -> Self {
        Self {
            trigger,
            overlay: None,
        }
    }

    pub fn with_overlay(mut self, overlay: NodeId) -> Self {
        self.overlay = Some(overlay);
        self
    }
}

/// Whether `node` is, or sits inside, one of the polisher's own controls
pub fn is_control_element<S: Surface + ?Sized>(
    surface: &S,
    node: Option<NodeId>,
    controls: &ToolControls,
) -> bool {
    let Some(node) = node else {
        return false;
    };
    surface.contains(controls.trigger, node)
        || controls
            .overlay
            .is_some_and(|overlay| surface.contains(overlay, node))
}

/// Whether `range` starts, ends or passes through one of the polisher's own controls
pub fn range_touches_controls<S: Surface + ?Sized>(
    surface: &S,
    range: &TextRange,
    controls: &ToolControls,
) -> bool {
    surface.range_intersects(range, controls.trigger)
        || controls
            .overlay
            .is_some_and(|overlay| surface.range_intersects(range, overlay))
}
