use crate::surface::{NodeId, Point, TextRange};

/// Char offsets `[start, end)` into a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offsets {
    start: usize,
    end: usize,
}

impl Offsets {
    /// `None` unless `start <= end`
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Where a capture came from. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    EditableField,
    PageText,
}

/// Selection inside a text area or text-like input
#[derive(Debug, Clone, PartialEq)]
pub struct EditableSelection {
    pub element: NodeId,
    /// Field content between the offsets at capture time
    pub text: String,
    /// `None` targets the whole field
    pub offsets: Option<Offsets>,
    pub anchor: Option<Point>,
}

/// Selection in free page content
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSelection {
    /// Stringified selection at capture time
    pub text: String,
    /// Private copy of the window selection's first range
    pub range: TextRange,
    /// The focused element, when it was itself offset-addressable
    pub focused_field: Option<NodeId>,
    pub anchor: Option<Point>,
}

/// What was selected, and how to find it again.
///
/// The two selection models are kept apart rather than squeezed into one
/// representation; snapshot, restore and apply all dispatch on the variant.
/// "Nothing selected" is `Option::None` at the call sites.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionContext {
    Editable(EditableSelection),
    Range(RangeSelection),
}

impl SelectionContext {
    /// Target the entire value of a field
    pub fn whole_field(element: NodeId, text: impl Into<String>) -> Self {
        SelectionContext::Editable(EditableSelection {
            element,
            text: text.into(),
            offsets: None,
            anchor: None,
        })
    }

    pub fn text(&self) -> &str {
        match self {
            SelectionContext::Editable(selection) => &selection.text,
            SelectionContext::Range(selection) => &selection.text,
        }
    }

    pub fn anchor(&self) -> Option<Point> {
        match self {
            SelectionContext::Editable(selection) => selection.anchor,
            SelectionContext::Range(selection) => selection.anchor,
        }
    }

    pub fn origin(&self) -> Origin {
        match self {
            SelectionContext::Editable(_) => Origin::EditableField,
            SelectionContext::Range(_) => Origin::PageText,
        }
    }

    /// Element the selection refers to, if any
    pub fn target_element(&self) -> Option<NodeId> {
        match self {
            SelectionContext::Editable(selection) => Some(selection.element),
            SelectionContext::Range(selection) => selection.focused_field,
        }
    }
}
