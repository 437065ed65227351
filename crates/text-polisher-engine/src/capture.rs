//! Selection capture.
//!
//! Looks at the focused element first, then at the window selection, and
//! produces a [`SelectionContext`] describing what is selected and how to
//! find it again later.

use crate::classify::is_offset_addressable;
use crate::context::{EditableSelection, Offsets, RangeSelection, SelectionContext};
use crate::surface::{NodeId, Point, Surface, char_len, char_slice};

/// Capture the current selection, or `None` when nothing usable is selected
pub fn capture<S: Surface + ?Sized>(surface: &S) -> Option<SelectionContext> {
    let active = surface.active_element();

    if let Some(context) = capture_editable(surface) {
        log::debug!("captured field selection in {:?}", active);
        return Some(context);
    }

    let text = surface.window_selection_text();
    if text.trim().is_empty() {
        return None;
    }
    // The window selection hands out a value; holding it is already a private copy
    let Some(range) = surface.window_selection_range() else {
        log::debug!("selection text without a range");
        return None;
    };

    let anchor = surface
        .range_rect(&range)
        .filter(|rect| !rect.is_empty())
        .map(|rect| rect.center())
        .or_else(|| element_center(surface, active));

    Some(SelectionContext::Range(RangeSelection {
        text,
        range,
        focused_field: active.filter(|node| is_offset_addressable(surface, Some(*node))),
        anchor,
    }))
}

fn capture_editable<S: Surface + ?Sized>(surface: &S) -> Option<SelectionContext> {
    let element = surface.active_element()?;
    if !is_offset_addressable(surface, Some(element)) {
        return None;
    }
    let (start, end) = surface.selection_offsets(element)?;
    if start == end {
        return None;
    }

    let value = surface.value(element)?;
    let len = char_len(&value);
    let offsets = Offsets::new(start.min(end).min(len), start.max(end).min(len))?;

    Some(SelectionContext::Editable(EditableSelection {
        element,
        text: char_slice(&value, offsets.start(), offsets.end()).to_string(),
        offsets: Some(offsets),
        anchor: element_center(surface, Some(element)),
    }))
}

fn element_center<S: Surface + ?Sized>(surface: &S, element: Option<NodeId>) -> Option<Point> {
    element
        .and_then(|element| surface.bounding_rect(element))
        .map(|rect| rect.center())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Origin;
    use crate::page::Page;
    use crate::surface::{Boundary, Rect, Size, TextRange};
    use pretty_assertions::assert_eq;

    fn page() -> Page {
        Page::new(Size::new(1024.0, 768.0))
    }

    #[test]
    fn test_nothing_selected() {
        let page = page();
        assert_eq!(capture(&page), None);
    }

    #[test]
    fn test_field_selection() {
        let mut page = page();
        let area = page.append_textarea(page.body(), "He go to school everyday. Yes.");
        page.set_rect(area, Rect::new(100.0, 200.0, 400.0, 100.0));
        page.focus(area, true);
        page.set_selection_offsets(area, 0, 25).unwrap();

        let Some(SelectionContext::Editable(selection)) = capture(&page) else {
            panic!("expected a field selection");
        };

        assert_eq!(selection.text, "He go to school everyday.");
        assert_eq!(selection.offsets, Offsets::new(0, 25));
        assert_eq!(selection.anchor, Some(Point::new(300.0, 250.0)));
    }

    #[test]
    fn test_collapsed_field_selection_falls_through_to_window_selection() {
        let mut page = page();
        let area = page.append_textarea(page.body(), "caret only");
        let text = page.append_text(page.body(), "Some page text");
        page.focus(area, true);
        page.set_selection_offsets(area, 3, 3).unwrap();
        page.select(TextRange::new(Boundary::new(text, 5), Boundary::new(text, 9)))
            .unwrap();

        let context = capture(&page).unwrap();

        assert_eq!(context.origin(), Origin::PageText);
        assert_eq!(context.text(), "page");
        assert_eq!(context.target_element(), Some(area));
    }

    #[test]
    fn test_range_selection_anchor_is_range_midpoint() {
        let mut page = page();
        let p = page.append_element(page.body(), "p");
        let text = page.append_text(p, "Select me please");
        page.set_rect(text, Rect::new(10.0, 40.0, 200.0, 20.0));
        page.select(TextRange::new(Boundary::new(text, 0), Boundary::new(text, 9)))
            .unwrap();

        let Some(SelectionContext::Range(selection)) = capture(&page) else {
            panic!("expected a range selection");
        };

        assert_eq!(selection.text, "Select me");
        assert_eq!(selection.anchor, Some(Point::new(110.0, 50.0)));
        assert_eq!(selection.focused_field, None);
    }

    #[test]
    fn test_range_anchor_falls_back_to_focused_element() {
        let mut page = page();
        let div = page.append_element(page.body(), "div");
        page.set_content_editable(div, true);
        page.set_rect(div, Rect::new(0.0, 0.0, 100.0, 100.0));
        let text = page.append_text(div, "editable region");
        // A zero-area rect on the text node itself
        page.set_rect(text, Rect::new(3.0, 3.0, 0.0, 0.0));
        page.focus(div, true);
        page.select(TextRange::new(Boundary::new(text, 0), Boundary::new(text, 8)))
            .unwrap();

        let context = capture(&page).unwrap();

        assert_eq!(context.anchor(), Some(Point::new(50.0, 50.0)));
        // contenteditable is range-addressed, so not recorded as a field
        assert_eq!(context.target_element(), None);
    }

    #[test]
    fn test_whitespace_only_window_selection_is_nothing() {
        let mut page = page();
        let text = page.append_text(page.body(), "a    b");
        page.select(TextRange::new(Boundary::new(text, 1), Boundary::new(text, 5)))
            .unwrap();

        assert_eq!(capture(&page), None);
    }

    #[test]
    fn test_captured_range_survives_page_mutation() {
        let mut page = page();
        let text = page.append_text(page.body(), "stable text");
        page.select(TextRange::new(Boundary::new(text, 0), Boundary::new(text, 6)))
            .unwrap();
        let context = capture(&page).unwrap();

        page.clear_window_selection();
        page.insert_text_at(Boundary::new(text, 0), "prefix ").unwrap();

        let SelectionContext::Range(selection) = context else {
            panic!("expected a range selection");
        };
        assert_eq!(selection.range.start, Boundary::new(text, 0));
        assert_eq!(selection.range.end, Boundary::new(text, 6));
    }
}
