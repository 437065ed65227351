//! Writing a rewrite back into the page.
//!
//! A bounded field selection is spliced in directly. Overwriting a whole
//! field or replacing page content is destructive enough to need the user's
//! go-ahead, so those return a [`PendingConfirmation`] that the caller
//! resolves with a [`Decision`] instead of blocking on a modal dialog.

use crate::classify::is_offset_addressable;
use crate::context::{EditableSelection, SelectionContext};
use crate::error::PolishError;
use crate::surface::{NodeId, Surface, TextRange, char_len};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Cancel,
}

/// Shown instead of mutating anything when there is no safe target
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackDialog {
    pub label: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
enum ConfirmTarget {
    WholeField(NodeId),
    Range(TextRange),
}

/// A destructive replacement waiting on the user
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConfirmation {
    target: ConfirmTarget,
    text: String,
    prompt: String,
}

/// Where a call to [`apply`] or [`PendingConfirmation::resolve`] ended up
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyStep {
    Applied,
    AwaitingConfirmation(PendingConfirmation),
    Cancelled,
    Fallback(FallbackDialog),
}

/// Replace the selection described by `context` with `new_text`
pub fn apply<S: Surface + ?Sized>(
    surface: &mut S,
    context: Option<&SelectionContext>,
    new_text: &str,
    label: &str,
) -> Result<ApplyStep, PolishError> {
    match context {
        Some(SelectionContext::Editable(selection)) => apply_to_field(surface, selection, new_text),
        Some(SelectionContext::Range(selection)) => {
            if !surface.range_is_live(&selection.range) {
                return Err(PolishError::StaleTarget);
            }
            Ok(ApplyStep::AwaitingConfirmation(PendingConfirmation {
                target: ConfirmTarget::Range(selection.range),
                text: new_text.to_string(),
                prompt: format!("Replace the selected page text with the polished result?\n\n{new_text}"),
            }))
        }
        None => Ok(ApplyStep::Fallback(FallbackDialog {
            label: label.to_string(),
            text: new_text.to_string(),
        })),
    }
}

fn apply_to_field<S: Surface + ?Sized>(
    surface: &mut S,
    selection: &EditableSelection,
    new_text: &str,
) -> Result<ApplyStep, PolishError> {
    let element = selection.element;
    ensure_field_live(surface, element)?;

    match selection.offsets {
        Some(offsets) if !offsets.is_empty() => {
            let len = surface.value(element).map_or(0, |value| char_len(&value));
            if offsets.end() > len {
                log::warn!(
                    "field shrank to {len} chars since capture, offsets {}..{} no longer fit",
                    offsets.start(),
                    offsets.end()
                );
                return Err(PolishError::StaleTarget);
            }
            surface.focus(element, false);
            surface.replace_value_range(element, offsets.start(), offsets.end(), new_text)?;
            log::info!("replaced {} chars in field {:?}", offsets.len(), element);
            Ok(ApplyStep::Applied)
        }
        _ => Ok(ApplyStep::AwaitingConfirmation(PendingConfirmation {
            target: ConfirmTarget::WholeField(element),
            text: new_text.to_string(),
            prompt: format!(
                "Replace the current field content with the polished result?\n\n{new_text}"
            ),
        })),
    }
}

fn ensure_field_live<S: Surface + ?Sized>(surface: &S, element: NodeId) -> Result<(), PolishError> {
    if surface.is_attached(element) && is_offset_addressable(surface, Some(element)) {
        Ok(())
    } else {
        Err(PolishError::StaleTarget)
    }
}

impl PendingConfirmation {
    /// Question to put to the user
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Carry out or drop the replacement. Liveness is checked again since
    /// the user may have taken their time.
    pub fn resolve<S: Surface + ?Sized>(
        self,
        surface: &mut S,
        decision: Decision,
    ) -> Result<ApplyStep, PolishError> {
        if decision == Decision::Cancel {
            log::debug!("replacement cancelled");
            return Ok(ApplyStep::Cancelled);
        }

        match self.target {
            ConfirmTarget::WholeField(element) => {
                ensure_field_live(surface, element)?;
                surface.focus(element, false);
                surface.set_value(element, &self.text)?;
                log::info!("overwrote field {:?}", element);
            }
            ConfirmTarget::Range(range) => {
                if !surface.range_is_live(&range) {
                    return Err(PolishError::StaleTarget);
                }
                surface.delete_range_contents(&range)?;
                surface.insert_text_at(range.start, &self.text)?;
                log::info!("replaced page range starting in {:?}", range.start.node);
            }
        }
        Ok(ApplyStep::Applied)
    }
}
