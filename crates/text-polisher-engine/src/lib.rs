/*!
 * # Selection polishing core
 *
 * Captures what the user selected on a page, keeps enough of it around to
 * find the selection again after a slow round-trip to a local rewriting
 * model, and writes the rewritten text back without disturbing anything
 * else on the page.
 *
 * Two selection models are in play and are never merged:
 *
 * - **Fields** (text areas, text-like inputs) address text by char offsets
 *   into their value. Replacements are splices of `value[start..end]`.
 * - **Page content** (including `contenteditable`) is addressed by a
 *   [`TextRange`] of two boundary points. Replacements delete the range and
 *   insert a fresh text node where it started.
 *
 * ## Module Structure
 *
 * - **`surface`**: the [`Surface`] trait the engine sees the page through
 * - **`page`**: in-memory [`Page`] implementing it
 * - **`classify`**: which nodes support offset addressing
 * - **`capture`**: current selection to [`SelectionContext`]
 * - **`snapshot`**: single-slot save / restore of a selection
 * - **`presenter`**: result overlay placement and apply gating
 * - **`applier`**: splicing results back, with confirmation for destructive cases
 * - **`guards`**: meaningful-content and own-control checks
 * - **`rewrite`**: the service seam and reply cleanup
 * - **`session`**: the controller tying it together
 *
 * ## Usage Pattern
 *
 * ```rust
 * use text_polisher_engine::*;
 *
 * let mut page = Page::new(Size::new(1280.0, 800.0));
 * let trigger = page.append_element(page.body(), "button");
 * let area = page.append_textarea(page.body(), "He go to school everyday.");
 * page.focus(area, true);
 * page.set_selection_offsets(area, 0, 25).unwrap();
 *
 * let mut session = Session::default();
 * let request = session.begin(&mut page, &ToolControls::new(trigger)).unwrap();
 * assert_eq!(request.text, "He go to school everyday.");
 *
 * // ... send `request` to the rewriting service ...
 * session.complete(&page, Ok("He goes to school every day.".to_string())).unwrap();
 * session.apply(&mut page).unwrap();
 *
 * assert_eq!(page.value(area).unwrap(), "He goes to school every day.");
 * ```
 */

pub mod applier;
pub mod capture;
pub mod classify;
pub mod context;
pub mod error;
pub mod guards;
pub mod page;
pub mod presenter;
pub mod rewrite;
pub mod session;
pub mod snapshot;
pub mod surface;

// Re-export key types for easier usage
pub use applier::{ApplyStep, Decision, FallbackDialog, PendingConfirmation};
pub use capture::capture;
pub use classify::{is_offset_addressable, supports_offsets};
pub use context::{EditableSelection, Offsets, Origin, RangeSelection, SelectionContext};
pub use error::PolishError;
pub use guards::{
    ToolControls, is_control_element, is_meaningful_content, range_touches_controls,
};
pub use page::Page;
pub use presenter::{OVERLAY_MARGIN, Overlay, Presenter, compute_position, default_anchor};
pub use rewrite::{RewriteRequest, RewriteService, ServiceError, strip_reasoning};
pub use session::{
    ApplyOutcome, ApplyState, DEFAULT_SYSTEM_PROMPT, PendingResult, Session, SessionOptions,
    TriggerState,
};
pub use snapshot::{Restore, SnapshotEntry, SnapshotStore};
pub use surface::{Boundary, NodeId, NodeKind, PageError, Point, Rect, Size, Surface, TextRange};
