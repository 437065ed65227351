//! Result overlay placement and state.

use crate::classify::is_offset_addressable;
use crate::context::SelectionContext;
use crate::snapshot::{Restore, SnapshotStore};
use crate::surface::{Point, Size, Surface};

/// Minimum gap between the overlay and any viewport edge
pub const OVERLAY_MARGIN: f64 = 12.0;

/// Distance of the fallback anchor from the bottom-right corner
const DEFAULT_ANCHOR_INSET: f64 = 80.0;

/// Where the overlay goes when the selection gave no usable position
pub fn default_anchor(viewport: Size) -> Point {
    Point::new(
        viewport.width - DEFAULT_ANCHOR_INSET,
        viewport.height - DEFAULT_ANCHOR_INSET,
    )
}

/// Top-left corner for an overlay of `overlay` size shown near `anchor`.
///
/// Offsets the overlay down-right of the anchor, pulls it back inside the
/// viewport when it would overflow, and never lets it start above or left of
/// `margin`.
pub fn compute_position(anchor: Point, overlay: Size, viewport: Size, margin: f64) -> Point {
    let mut left = anchor.x + margin;
    let mut top = anchor.y + margin;

    if left + overlay.width + margin > viewport.width {
        left = viewport.width - overlay.width - margin;
    }
    if top + overlay.height + margin > viewport.height {
        top = viewport.height - overlay.height - margin;
    }

    Point::new(left.max(margin), top.max(margin))
}

/// Whether a replacement target is still viable for `context`
pub fn can_apply<S: Surface + ?Sized>(surface: &S, context: Option<&SelectionContext>) -> bool {
    match context {
        Some(SelectionContext::Editable(selection)) => {
            surface.is_attached(selection.element)
                && is_offset_addressable(surface, Some(selection.element))
        }
        Some(SelectionContext::Range(selection)) => surface.range_is_live(&selection.range),
        None => false,
    }
}

/// What the overlay currently shows
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub text: String,
    pub position: Point,
    pub size: Size,
    /// Copy always works; apply only while the target is viable
    pub apply_enabled: bool,
    pub visible: bool,
}

#[derive(Debug)]
pub struct Presenter {
    margin: f64,
    overlay: Option<Overlay>,
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new(OVERLAY_MARGIN)
    }
}

impl Presenter {
    pub fn new(margin: f64) -> Self {
        Self {
            margin,
            overlay: None,
        }
    }

    /// The overlay, while it is on screen
    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref().filter(|overlay| overlay.visible)
    }

    pub fn is_visible(&self) -> bool {
        self.overlay().is_some()
    }

    pub fn show<S: Surface + ?Sized>(
        &mut self,
        surface: &S,
        text: &str,
        anchor: Option<Point>,
        context: Option<&SelectionContext>,
    ) -> &Overlay {
        let viewport = surface.viewport();
        let size = surface.measure_overlay(text);
        let anchor = anchor.unwrap_or_else(|| default_anchor(viewport));
        let apply_enabled = can_apply(surface, context);
        if !apply_enabled {
            log::info!("replacement target unavailable, overlay is view-only");
        }

        self.overlay.insert(Overlay {
            text: text.to_string(),
            position: compute_position(anchor, size, viewport, self.margin),
            size,
            apply_enabled,
            visible: true,
        })
    }

    /// Hide the overlay, optionally putting the saved selection back
    pub fn hide<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        snapshot: &mut SnapshotStore,
        restore_selection: bool,
    ) -> Option<Restore> {
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.visible = false;
        }
        restore_selection.then(|| snapshot.restore(surface))
    }
}
