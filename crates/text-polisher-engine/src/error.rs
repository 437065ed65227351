use thiserror::Error;

use crate::rewrite::ServiceError;
use crate::surface::PageError;

/// Everything that can end a polish cycle early.
///
/// The `Display` text is what the user is shown. None of these are faults:
/// each one is handled at the UI boundary and leaves the trigger idle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolishError {
    #[error("Select the text you want to polish first.")]
    NoSelection,

    #[error("Select text in the page content, not in the polisher's own controls.")]
    SelfReferentialSelection,

    #[error("The original selection is no longer on the page.")]
    StaleTarget,

    #[error(
        "Could not reach the local rewriting service. Make sure `ollama serve` is running.{}",
        .detail.as_deref().map(|detail| format!("\n\nDetails: {detail}")).unwrap_or_default()
    )]
    TransportFailure { detail: Option<String> },

    #[error("The model produced no usable output. Please try again.")]
    EmptyResult,

    #[error("Could not understand the rewriting service's response.")]
    ParseFailure { reason: String },

    #[error("A rewrite is already in progress.")]
    Busy,

    #[error("There is no rewrite waiting for a result.")]
    NotInFlight,

    #[error("There is no polished result to apply.")]
    NothingPending,

    #[error("Clipboard unavailable, copy the result manually.")]
    ClipboardUnavailable,
}

impl From<ServiceError> for PolishError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Transport { reason } => PolishError::TransportFailure {
                detail: (!reason.is_empty()).then_some(reason),
            },
            ServiceError::Status { code } => PolishError::TransportFailure {
                detail: Some(format!("HTTP status {code}")),
            },
            ServiceError::Parse { reason } => PolishError::ParseFailure { reason },
        }
    }
}

/// A page operation failing mid-apply means the target moved out from under us
impl From<PageError> for PolishError {
    fn from(error: PageError) -> Self {
        match error {
            PageError::ClipboardUnavailable => PolishError::ClipboardUnavailable,
            other => {
                log::debug!("page mutation failed: {other}");
                PolishError::StaleTarget
            }
        }
    }
}
