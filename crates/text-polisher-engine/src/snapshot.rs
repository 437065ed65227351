//! Single-slot selection snapshot.
//!
//! Remembers the selection a rewrite was requested for, so that dismissing
//! the result overlay puts the user's selection back where it was. A target
//! that has since left the page is an expected outcome of page mutation:
//! the slot is dropped quietly instead of reporting an error.

use crate::classify::is_offset_addressable;
use crate::context::{Offsets, SelectionContext};
use crate::surface::{NodeId, Surface, TextRange, char_len};

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEntry {
    Editable {
        element: NodeId,
        /// `None` restores by selecting the whole value
        offsets: Option<Offsets>,
    },
    Range {
        range: TextRange,
    },
}

/// Result of [`SnapshotStore::restore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    /// Nothing was saved
    Empty,
    /// The saved target is gone; the slot has been cleared
    Stale,
    /// Focus and selection were re-established
    Restored,
}

#[derive(Debug, Default)]
pub struct SnapshotStore {
    slot: Option<SnapshotEntry>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self) -> Option<&SnapshotEntry> {
        self.slot.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Keep a copy of `context` for a later [`restore`](Self::restore).
    /// Anything that is not an actionable selection clears the slot.
    pub fn save<S: Surface + ?Sized>(&mut self, surface: &S, context: Option<&SelectionContext>) {
        self.slot = match context {
            Some(SelectionContext::Editable(selection)) => {
                if surface.is_attached(selection.element) {
                    Some(SnapshotEntry::Editable {
                        element: selection.element,
                        offsets: selection.offsets,
                    })
                } else {
                    None
                }
            }
            // Copied again here so the slot never shares a range with the context
            Some(SelectionContext::Range(selection)) => Some(SnapshotEntry::Range {
                range: selection.range,
            }),
            None => None,
        };
        log::debug!("selection snapshot saved: {:?}", self.slot);
    }

    /// Re-establish focus and selection from the saved entry
    pub fn restore<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Restore {
        let Some(entry) = self.slot.clone() else {
            return Restore::Empty;
        };

        match entry {
            SnapshotEntry::Editable { element, offsets } => {
                if !surface.is_attached(element) || !is_offset_addressable(surface, Some(element))
                {
                    return self.drop_stale();
                }
                surface.focus(element, true);
                let (start, end) = match offsets {
                    Some(offsets) => (offsets.start(), offsets.end()),
                    None => (0, surface.value(element).map_or(0, |value| char_len(&value))),
                };
                if let Err(e) = surface.set_selection_offsets(element, start, end) {
                    log::debug!("could not restore field selection: {e}");
                }
                Restore::Restored
            }
            SnapshotEntry::Range { range } => {
                if !surface.range_is_live(&range) {
                    return self.drop_stale();
                }
                surface.clear_window_selection();
                match surface.add_window_range(range) {
                    Ok(()) => {
                        // Keep a fresh copy, not the one now owned by the window selection
                        self.slot = Some(SnapshotEntry::Range { range });
                        Restore::Restored
                    }
                    Err(e) => {
                        log::debug!("could not restore range selection: {e}");
                        self.drop_stale()
                    }
                }
            }
        }
    }

    fn drop_stale(&mut self) -> Restore {
        log::debug!("selection snapshot target is gone, clearing");
        self.slot = None;
        Restore::Stale
    }
}
