//! In-memory page implementing [`Surface`].
//!
//! A small element/text node arena with parent links, per-node layout
//! rectangles, focus, a window selection and a clipboard. Text node content
//! and field values are held in `xi_rope::Rope` buffers and edited through
//! deltas. Range deletion and text insertion follow DOM semantics closely
//! enough that replacements land at the same structural position a browser
//! would put them.

use xi_rope::Rope;
use xi_rope::delta::Builder;

use crate::surface::{
    Boundary, NodeId, NodeKind, PageError, Rect, Size, Surface, TextRange, char_len, char_slice,
    char_to_byte,
};

// Overlay metrics, matching the stylesheet the overlay ships with
const OVERLAY_MIN_WIDTH: f64 = 220.0;
const OVERLAY_MAX_WIDTH: f64 = 320.0;
const OVERLAY_PADDING_X: f64 = 36.0;
const OVERLAY_CHROME_HEIGHT: f64 = 96.0; // padding, heading and button row
const OVERLAY_LINE_HEIGHT: f64 = 20.3;
const OVERLAY_CHAR_WIDTH: f64 = 7.5;

#[derive(Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Text node content, or a field's value
    text: Rope,
    /// Field selection as char offsets
    selection: (usize, usize),
    rect: Option<Rect>,
}

impl NodeData {
    fn new(kind: NodeKind, text: &str) -> Self {
        let len = char_len(text);
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            text: Rope::from(text),
            selection: (len, len),
            rect: None,
        }
    }

    fn is_field(&self) -> bool {
        matches!(self.kind, NodeKind::TextArea | NodeKind::Input { .. })
    }

    fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text)
    }
}

#[derive(Clone)]
pub struct Page {
    nodes: Vec<NodeData>,
    body: NodeId,
    focused: Option<NodeId>,
    selection: Option<TextRange>,
    viewport: Size,
    clipboard: Option<String>,
    clipboard_available: bool,
    /// Number of focus calls that were allowed to scroll
    scroll_count: usize,
}

impl Page {
    pub fn new(viewport: Size) -> Self {
        let body = NodeData::new(
            NodeKind::Element {
                tag: "body".to_string(),
                content_editable: false,
            },
            "",
        );
        Self {
            nodes: vec![body],
            body: NodeId(0),
            focused: None,
            selection: None,
            viewport,
            clipboard: None,
            clipboard_available: true,
            scroll_count: 0,
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.append(
            parent,
            NodeData::new(
                NodeKind::Element {
                    tag: tag.to_string(),
                    content_editable: false,
                },
                "",
            ),
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.append(parent, NodeData::new(NodeKind::Text, text))
    }

    pub fn append_textarea(&mut self, parent: NodeId, value: &str) -> NodeId {
        self.append(parent, NodeData::new(NodeKind::TextArea, value))
    }

    pub fn append_input(&mut self, parent: NodeId, input_type: Option<&str>, value: &str) -> NodeId {
        let kind = NodeKind::Input {
            input_type: input_type.map(str::to_string),
        };
        self.append(parent, NodeData::new(kind, value))
    }

    pub fn set_content_editable(&mut self, node: NodeId, editable: bool) {
        if let Some(NodeKind::Element {
            content_editable, ..
        }) = self.node_mut(node).map(|data| &mut data.kind)
        {
            *content_editable = editable;
        }
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        if let Some(data) = self.node_mut(node) {
            data.rect = Some(rect);
        }
    }

    /// Remove a node (and its subtree) from the document
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.node(node).and_then(|data| data.parent) else {
            return;
        };
        if let Some(focused) = self.focused
            && self.contains(node, focused)
        {
            self.focused = None;
        }
        if let Some(data) = self.node_mut(parent) {
            data.children.retain(|child| *child != node);
        }
        if let Some(data) = self.node_mut(node) {
            data.parent = None;
        }
    }

    /// Concatenated text of a node's subtree (a field's value for fields)
    pub fn text_content(&self, node: NodeId) -> String {
        let Some(data) = self.node(node) else {
            return String::new();
        };
        if data.is_text() || data.is_field() {
            return data.text.to_string();
        }
        data.children
            .iter()
            .filter(|child| self.node(**child).is_some_and(|data| !data.is_field()))
            .map(|child| self.text_content(*child))
            .collect()
    }

    /// Replace the window selection with `range`
    pub fn select(&mut self, range: TextRange) -> Result<(), PageError> {
        self.clear_window_selection();
        self.add_window_range(range)
    }

    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    pub fn set_clipboard_available(&mut self, available: bool) {
        self.clipboard_available = available;
    }

    pub fn scroll_count(&self) -> usize {
        self.scroll_count
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.0)
    }

    fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        let index = self.node(parent).map_or(0, |data| data.children.len());
        self.attach(parent, id, index);
        id
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, index: usize) {
        if let Some(data) = self.node_mut(parent) {
            let index = index.min(data.children.len());
            data.children.insert(index, child);
        }
        if let Some(data) = self.node_mut(child) {
            data.parent = Some(parent);
        }
    }

    /// Create a text node right after `sibling` under the same parent
    fn insert_text_after(&mut self, sibling: NodeId, text: &str) -> Result<NodeId, PageError> {
        let parent = self
            .node(sibling)
            .and_then(|data| data.parent)
            .ok_or(PageError::Detached(sibling))?;
        let index = self
            .node(parent)
            .and_then(|data| data.children.iter().position(|child| *child == sibling))
            .ok_or(PageError::Detached(sibling))?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(NodeKind::Text, text));
        self.attach(parent, id, index + 1);
        Ok(id)
    }

    /// Attached nodes in document order
    fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.body];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(data) = self.node(id) {
                stack.extend(data.children.iter().rev().copied());
            }
        }
        order
    }

    fn text_node(&self, id: NodeId) -> Result<&NodeData, PageError> {
        let data = self.node(id).ok_or(PageError::UnknownNode(id))?;
        if !data.is_text() {
            return Err(PageError::NotText(id));
        }
        Ok(data)
    }

    fn field(&self, id: NodeId) -> Result<&NodeData, PageError> {
        let data = self.node(id).ok_or(PageError::UnknownNode(id))?;
        if !data.is_field() {
            return Err(PageError::NotAField(id));
        }
        Ok(data)
    }

    /// Replace chars `[start, end)` of a node's rope
    fn edit(&mut self, id: NodeId, start: usize, end: usize, text: &str) -> Result<(), PageError> {
        let data = self.node_mut(id).ok_or(PageError::UnknownNode(id))?;
        let current = data.text.to_string();
        let len = char_len(&current);
        if start > end || end > len {
            return Err(PageError::OffsetOutOfBounds {
                offset: start.max(end),
                len,
            });
        }

        let from = char_to_byte(&current, start);
        let to = char_to_byte(&current, end);
        let mut builder = Builder::new(data.text.len());
        if text.is_empty() {
            builder.delete(from..to);
        } else {
            builder.replace(from..to, Rope::from(text));
        }
        let delta = builder.build();
        data.text = delta.apply(&data.text);
        Ok(())
    }

    /// Text nodes a live range touches, in document order
    fn covered_text_nodes(&self, range: &TextRange) -> Vec<NodeId> {
        if range.start.node == range.end.node {
            return vec![range.start.node];
        }
        let order = self.preorder();
        let (Some(from), Some(to)) = (
            order.iter().position(|id| *id == range.start.node),
            order.iter().position(|id| *id == range.end.node),
        ) else {
            return Vec::new();
        };
        order[from..=to]
            .iter()
            .copied()
            .filter(|id| self.node(*id).is_some_and(NodeData::is_text))
            .collect()
    }

    /// Layout rectangle of a node, falling back to its nearest laid-out ancestor
    fn layout_rect(&self, mut id: NodeId) -> Option<Rect> {
        loop {
            let data = self.node(id)?;
            if let Some(rect) = data.rect {
                return Some(rect);
            }
            id = data.parent?;
        }
    }
}

impl Surface for Page {
    fn active_element(&self) -> Option<NodeId> {
        self.focused.filter(|id| self.is_attached(*id))
    }

    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.node(node).map(|data| data.kind.clone())
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.body {
                return true;
            }
            match self.node(current).and_then(|data| data.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).and_then(|data| data.parent);
        }
        false
    }

    fn value(&self, field: NodeId) -> Option<String> {
        self.field(field).ok().map(|data| data.text.to_string())
    }

    fn selection_offsets(&self, field: NodeId) -> Option<(usize, usize)> {
        self.field(field).ok().map(|data| data.selection)
    }

    fn set_value(&mut self, field: NodeId, value: &str) -> Result<(), PageError> {
        self.field(field)?;
        let len = char_len(value);
        if let Some(data) = self.node_mut(field) {
            data.text = Rope::from(value);
            data.selection = (len, len);
        }
        Ok(())
    }

    fn replace_value_range(
        &mut self,
        field: NodeId,
        start: usize,
        end: usize,
        text: &str,
    ) -> Result<(), PageError> {
        self.field(field)?;
        self.edit(field, start, end, text)?;
        // Assigning a value parks the caret at the end
        if let Some(data) = self.node_mut(field) {
            let len = data.text.to_string().chars().count();
            data.selection = (len, len);
        }
        Ok(())
    }

    fn set_selection_offsets(
        &mut self,
        field: NodeId,
        start: usize,
        end: usize,
    ) -> Result<(), PageError> {
        let len = char_len(&self.field(field)?.text.to_string());
        let end = end.min(len);
        let start = start.min(end);
        if let Some(data) = self.node_mut(field) {
            data.selection = (start, end);
        }
        Ok(())
    }

    fn focus(&mut self, node: NodeId, prevent_scroll: bool) {
        if !self.is_attached(node) {
            return;
        }
        self.focused = Some(node);
        if !prevent_scroll {
            self.scroll_count += 1;
        }
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        if !self.is_attached(node) {
            return None;
        }
        self.node(node).and_then(|data| data.rect)
    }

    fn window_selection_text(&self) -> String {
        self.selection
            .and_then(|range| self.range_text(&range))
            .unwrap_or_default()
    }

    fn window_selection_range(&self) -> Option<TextRange> {
        self.selection
    }

    fn clear_window_selection(&mut self) {
        self.selection = None;
    }

    fn add_window_range(&mut self, range: TextRange) -> Result<(), PageError> {
        if !self.range_is_live(&range) {
            return Err(PageError::StaleRange);
        }
        self.selection = Some(range);
        Ok(())
    }

    fn range_is_live(&self, range: &TextRange) -> bool {
        let in_bounds = |boundary: &Boundary| {
            self.is_attached(boundary.node)
                && self
                    .text_node(boundary.node)
                    .is_ok_and(|data| boundary.offset <= char_len(&data.text.to_string()))
        };
        if !in_bounds(&range.start) || !in_bounds(&range.end) {
            return false;
        }
        if range.start.node == range.end.node {
            return range.start.offset <= range.end.offset;
        }
        let order = self.preorder();
        let from = order.iter().position(|id| *id == range.start.node);
        let to = order.iter().position(|id| *id == range.end.node);
        matches!((from, to), (Some(from), Some(to)) if from < to)
    }

    fn range_intersects(&self, range: &TextRange, node: NodeId) -> bool {
        if !self.range_is_live(range) {
            return false;
        }
        let order = self.preorder();
        let (Some(from), Some(to)) = (
            order.iter().position(|id| *id == range.start.node),
            order.iter().position(|id| *id == range.end.node),
        ) else {
            return false;
        };
        order[from..=to].iter().any(|id| self.contains(node, *id))
    }

    fn range_rect(&self, range: &TextRange) -> Option<Rect> {
        if !self.range_is_live(range) || range.is_collapsed() {
            return None;
        }
        self.covered_text_nodes(range)
            .into_iter()
            .filter_map(|id| self.layout_rect(id))
            .reduce(|acc, rect| acc.union(&rect))
    }

    fn range_text(&self, range: &TextRange) -> Option<String> {
        if !self.range_is_live(range) {
            return None;
        }
        let mut text = String::new();
        for id in self.covered_text_nodes(range) {
            let content = self.node(id)?.text.to_string();
            let start = if id == range.start.node {
                range.start.offset
            } else {
                0
            };
            let end = if id == range.end.node {
                range.end.offset
            } else {
                char_len(&content)
            };
            text.push_str(char_slice(&content, start, end));
        }
        Some(text)
    }

    fn delete_range_contents(&mut self, range: &TextRange) -> Result<(), PageError> {
        if !self.range_is_live(range) {
            return Err(PageError::StaleRange);
        }
        let (start, end) = (range.start, range.end);
        if start.node == end.node {
            return self.edit(start.node, start.offset, end.offset, "");
        }

        // Nodes strictly between the boundaries that are not ancestors of the
        // end container are fully contained; only their topmost ones get detached.
        let order = self.preorder();
        let from = order.iter().position(|id| *id == start.node);
        let to = order.iter().position(|id| *id == end.node);
        let (Some(from), Some(to)) = (from, to) else {
            return Err(PageError::StaleRange);
        };
        let contained: Vec<NodeId> = order[from + 1..to]
            .iter()
            .copied()
            .filter(|id| !self.contains(*id, end.node))
            .collect();
        let topmost: Vec<NodeId> = contained
            .iter()
            .copied()
            .filter(|id| {
                self.node(*id)
                    .and_then(|data| data.parent)
                    .is_none_or(|parent| !contained.contains(&parent))
            })
            .collect();

        let start_len = char_len(&self.text_node(start.node)?.text.to_string());
        self.edit(start.node, start.offset, start_len, "")?;
        self.edit(end.node, 0, end.offset, "")?;
        for id in topmost {
            self.detach(id);
        }
        Ok(())
    }

    fn insert_text_at(&mut self, at: Boundary, text: &str) -> Result<NodeId, PageError> {
        if !self.is_attached(at.node) {
            return Err(PageError::Detached(at.node));
        }
        let content = self.text_node(at.node)?.text.to_string();
        let len = char_len(&content);
        if at.offset > len {
            return Err(PageError::OffsetOutOfBounds {
                offset: at.offset,
                len,
            });
        }

        let suffix = char_slice(&content, at.offset, len).to_string();
        self.edit(at.node, at.offset, len, "")?;
        let inserted = self.insert_text_after(at.node, text)?;
        if !suffix.is_empty() {
            self.insert_text_after(inserted, &suffix)?;
        }
        Ok(inserted)
    }

    fn viewport(&self) -> Size {
        self.viewport
    }

    fn measure_overlay(&self, text: &str) -> Size {
        let longest = text.lines().map(char_len).max().unwrap_or(0) as f64;
        let width = (longest * OVERLAY_CHAR_WIDTH + OVERLAY_PADDING_X)
            .clamp(OVERLAY_MIN_WIDTH, OVERLAY_MAX_WIDTH);
        let content_width = width - OVERLAY_PADDING_X;
        let lines: f64 = text
            .lines()
            .map(|line| {
                let wrapped = (char_len(line) as f64 * OVERLAY_CHAR_WIDTH / content_width).ceil();
                wrapped.max(1.0)
            })
            .sum();
        Size::new(
            width,
            OVERLAY_CHROME_HEIGHT + lines.max(1.0) * OVERLAY_LINE_HEIGHT,
        )
    }

    fn write_clipboard(&mut self, text: &str) -> Result<(), PageError> {
        if !self.clipboard_available {
            return Err(PageError::ClipboardUnavailable);
        }
        self.clipboard = Some(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page() -> Page {
        Page::new(Size::new(1280.0, 800.0))
    }

    #[test]
    fn test_detached_nodes_are_not_attached() {
        let mut page = page();
        let div = page.append_element(page.body(), "div");
        let text = page.append_text(div, "hello");

        assert!(page.is_attached(text));
        page.detach(div);
        assert!(!page.is_attached(text));
        assert!(!page.is_attached(div));
    }

    #[test]
    fn test_detaching_focused_field_clears_focus() {
        let mut page = page();
        let area = page.append_textarea(page.body(), "draft");
        page.focus(area, true);

        page.detach(area);

        assert_eq!(page.active_element(), None);
    }

    #[test]
    fn test_text_content_skips_field_values() {
        let mut page = page();
        let p = page.append_element(page.body(), "p");
        page.append_text(p, "Hello ");
        page.append_input(p, None, "ignored");
        page.append_text(p, "world");

        assert_eq!(page.text_content(p), "Hello world");
    }

    #[test]
    fn test_replace_value_range_splices_chars() {
        let mut page = page();
        let area = page.append_textarea(page.body(), "naïve café text");

        page.replace_value_range(area, 6, 10, "bistro").unwrap();

        assert_eq!(page.value(area).unwrap(), "naïve bistro text");
        assert_eq!(page.selection_offsets(area), Some((17, 17)));
    }

    #[test]
    fn test_replace_value_range_rejects_out_of_bounds() {
        let mut page = page();
        let area = page.append_textarea(page.body(), "short");

        let result = page.replace_value_range(area, 2, 40, "x");

        assert_eq!(
            result,
            Err(PageError::OffsetOutOfBounds { offset: 40, len: 5 })
        );
        assert_eq!(page.value(area).unwrap(), "short");
    }

    #[test]
    fn test_set_selection_offsets_clamps() {
        let mut page = page();
        let area = page.append_textarea(page.body(), "abc");

        page.set_selection_offsets(area, 5, 9).unwrap();

        assert_eq!(page.selection_offsets(area), Some((3, 3)));
    }

    #[test]
    fn test_range_text_spans_nodes() {
        let mut page = page();
        let p = page.append_element(page.body(), "p");
        let first = page.append_text(p, "The quick ");
        let em = page.append_element(p, "em");
        page.append_text(em, "brown");
        let last = page.append_text(p, " fox jumps");

        let range = TextRange::new(Boundary::new(first, 4), Boundary::new(last, 4));

        assert_eq!(page.range_text(&range).unwrap(), "quick brown fox");
    }

    #[test]
    fn test_range_out_of_order_is_not_live() {
        let mut page = page();
        let p = page.append_element(page.body(), "p");
        let first = page.append_text(p, "one");
        let second = page.append_text(p, "two");

        let backwards = TextRange::new(Boundary::new(second, 0), Boundary::new(first, 1));

        assert!(!page.range_is_live(&backwards));
    }

    #[test]
    fn test_range_past_text_end_is_not_live() {
        let mut page = page();
        let text = page.append_text(page.body(), "tiny");

        let range = TextRange::new(Boundary::new(text, 0), Boundary::new(text, 9));

        assert!(!page.range_is_live(&range));
    }

    #[test]
    fn test_delete_range_contents_across_nodes() {
        let mut page = page();
        let p = page.append_element(page.body(), "p");
        let first = page.append_text(p, "The quick ");
        let em = page.append_element(p, "em");
        page.append_text(em, "brown");
        let last = page.append_text(p, " fox jumps");

        let range = TextRange::new(Boundary::new(first, 4), Boundary::new(last, 4));
        page.delete_range_contents(&range).unwrap();

        assert_eq!(page.text_content(p), "The  jumps");
        assert!(!page.is_attached(em));
    }

    #[test]
    fn test_insert_text_at_splits_text_node() {
        let mut page = page();
        let p = page.append_element(page.body(), "p");
        let text = page.append_text(p, "Hello world");

        let inserted = page.insert_text_at(Boundary::new(text, 5), ",").unwrap();

        assert_eq!(page.text_content(p), "Hello, world");
        assert_eq!(page.text_content(text), "Hello");
        assert_eq!(page.text_content(inserted), ",");
    }

    #[test]
    fn test_range_rect_unions_covered_nodes() {
        let mut page = page();
        let p = page.append_element(page.body(), "p");
        let first = page.append_text(p, "left");
        let second = page.append_text(p, "right");
        page.set_rect(first, Rect::new(10.0, 10.0, 40.0, 20.0));
        page.set_rect(second, Rect::new(50.0, 10.0, 50.0, 20.0));

        let range = TextRange::new(Boundary::new(first, 1), Boundary::new(second, 2));

        assert_eq!(
            page.range_rect(&range),
            Some(Rect::new(10.0, 10.0, 90.0, 20.0))
        );
    }

    #[test]
    fn test_measure_overlay_respects_width_bounds() {
        let page = page();

        assert_eq!(page.measure_overlay("ok").width, OVERLAY_MIN_WIDTH);
        assert_eq!(page.measure_overlay(&"x".repeat(500)).width, OVERLAY_MAX_WIDTH);
    }

    #[test]
    fn test_clipboard_unavailable() {
        let mut page = page();
        page.set_clipboard_available(false);

        assert_eq!(
            page.write_clipboard("text"),
            Err(PageError::ClipboardUnavailable)
        );
        assert_eq!(page.clipboard(), None);
    }
}
