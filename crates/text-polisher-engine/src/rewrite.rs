//! The seam to the external rewriting service.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// One rewrite call: the system instruction plus the captured text
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteRequest {
    pub system_prompt: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error("Request failed: {reason}")]
    Transport { reason: String },

    #[error("Service answered with HTTP status {code}")]
    Status { code: u16 },

    #[error("Unexpected response: {reason}")]
    Parse { reason: String },
}

/// Anything that can turn a [`RewriteRequest`] into rewritten text
pub trait RewriteService {
    fn rewrite(&self, request: &RewriteRequest) -> Result<String, ServiceError>;
}

/// Drop reasoning blocks and surrounding whitespace from a model reply
pub fn strip_reasoning(text: &str) -> String {
    // Reasoning blocks some local models emit ahead of the answer
    static REASONING_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = REASONING_REGEX.get_or_init(|| {
        Regex::new(r"(?s)<think>.*?</think>|<thinking>.*?</thinking>")
            .expect("Invalid reasoning regex")
    });
    regex.replace_all(text, "").trim().to_string()
}
