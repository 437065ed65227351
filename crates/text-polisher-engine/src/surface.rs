//! The page model the engine operates on.
//!
//! The engine never touches a real document directly. Everything it needs
//! from the host page (focus, form values, the window selection, layout
//! rectangles) goes through the [`Surface`] trait, so the same capture /
//! snapshot / apply logic runs against a browser bridge or the in-memory
//! [`Page`](crate::page::Page) used by the CLI and the tests.

use thiserror::Error;

/// Handle to a node on the page.
///
/// A `NodeId` is a back reference only: holding one never keeps the node
/// alive, and the node it names may be detached at any time. Check
/// [`Surface::is_attached`] before acting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// A collapsed rectangle carries no usable position
    pub fn is_empty(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        Rect::new(
            left,
            top,
            self.right().max(other.right()) - left,
            self.bottom().max(other.bottom()) - top,
        )
    }
}

/// What kind of node a [`NodeId`] refers to
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Multi-line text area
    TextArea,
    /// `<input>`; `None` when the element carries no explicit `type`
    Input { input_type: Option<String> },
    /// Any other element
    Element { tag: String, content_editable: bool },
    /// Text node
    Text,
}

/// One end of a [`TextRange`]: a char offset into a text node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A span of page text between two boundary points.
///
/// Ranges are plain values: cloning one copies its boundaries, so later page
/// mutations can never move a range that has already been captured. The
/// flip side is that a stored range may stop describing anything real, and
/// must be revalidated with [`Surface::range_is_live`] before every use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl TextRange {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PageError {
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("Node {0:?} is not attached to the document")]
    Detached(NodeId),

    #[error("Node {0:?} is not a text field")]
    NotAField(NodeId),

    #[error("Node {0:?} is not a text node")]
    NotText(NodeId),

    #[error("Offset {offset} is out of bounds for length {len}")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("Range no longer describes live page content")]
    StaleRange,

    #[error("Clipboard unavailable")]
    ClipboardUnavailable,
}

/// Capabilities the engine needs from the host page.
///
/// All offsets into field values and text nodes are char offsets.
pub trait Surface {
    /// Currently focused element, if any
    fn active_element(&self) -> Option<NodeId>;

    fn node_kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Whether the node is still part of the document tree
    fn is_attached(&self, node: NodeId) -> bool;

    /// Whether `node` is `ancestor` or lies inside it
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool;

    /// Current value of a text field
    fn value(&self, field: NodeId) -> Option<String>;

    /// Current `(selectionStart, selectionEnd)` of a text field
    fn selection_offsets(&self, field: NodeId) -> Option<(usize, usize)>;

    /// Overwrite the whole value of a text field
    fn set_value(&mut self, field: NodeId, value: &str) -> Result<(), PageError>;

    /// Replace the chars in `[start, end)` of a field's value
    fn replace_value_range(
        &mut self,
        field: NodeId,
        start: usize,
        end: usize,
        text: &str,
    ) -> Result<(), PageError>;

    /// Select `[start, end)` in a text field; offsets past the end are clamped
    fn set_selection_offsets(
        &mut self,
        field: NodeId,
        start: usize,
        end: usize,
    ) -> Result<(), PageError>;

    fn focus(&mut self, node: NodeId, prevent_scroll: bool);

    fn bounding_rect(&self, node: NodeId) -> Option<Rect>;

    /// Stringified window selection
    fn window_selection_text(&self) -> String;

    /// First range of the window selection
    fn window_selection_range(&self) -> Option<TextRange>;

    fn clear_window_selection(&mut self);

    fn add_window_range(&mut self, range: TextRange) -> Result<(), PageError>;

    /// Both boundaries attached, in bounds and in document order
    fn range_is_live(&self, range: &TextRange) -> bool;

    /// Whether a live range covers any part of `node` or its descendants
    fn range_intersects(&self, range: &TextRange, node: NodeId) -> bool;

    fn range_rect(&self, range: &TextRange) -> Option<Rect>;

    fn range_text(&self, range: &TextRange) -> Option<String>;

    /// Remove everything the range covers
    fn delete_range_contents(&mut self, range: &TextRange) -> Result<(), PageError>;

    /// Insert a new text node at `at`, splitting the text node it points into
    fn insert_text_at(&mut self, at: Boundary, text: &str) -> Result<NodeId, PageError>;

    fn viewport(&self) -> Size;

    /// Rendered size of the result overlay when showing `text`
    fn measure_overlay(&self, text: &str) -> Size;

    fn write_clipboard(&mut self, text: &str) -> Result<(), PageError>;
}

/// Number of chars in `text`
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the `chars`-th char, or `text.len()` past the end
pub(crate) fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

/// Chars `[start, end)` of `text`
pub(crate) fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let start = char_to_byte(text, start);
    let end = char_to_byte(text, end).max(start);
    &text[start..end]
}
