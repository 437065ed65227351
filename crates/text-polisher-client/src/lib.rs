//! Chat-completions client for the local rewriting service.
//!
//! Speaks the OpenAI-compatible `/v1/chat/completions` endpoint that
//! `ollama serve` exposes, non-streaming.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use text_polisher_config::Config;
use text_polisher_engine::{RewriteRequest, RewriteService, ServiceError};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

pub struct OllamaClient {
    agent: ureq::Agent,
    api_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(api_url: &str, model: &str, temperature: f32, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
            api_url: api_url.to_string(),
            model: model.to_string(),
            temperature,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.api_url,
            &config.model,
            config.temperature,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn payload<'a>(&'a self, request: &'a RewriteRequest) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.text,
                },
            ],
            temperature: self.temperature,
            stream: false,
        }
    }
}

impl RewriteService for OllamaClient {
    fn rewrite(&self, request: &RewriteRequest) -> Result<String, ServiceError> {
        log::debug!("POST {} with model {}", self.api_url, self.model);
        let response = self
            .agent
            .post(self.api_url.as_str())
            // Ollama ignores the token but some proxies insist on the header
            .header("Authorization", "Bearer ollama")
            .send_json(self.payload(request))
            .map_err(transport_error)?;

        let body = response
            .into_body()
            .read_to_string()
            .map_err(transport_error)?;
        parse_completion(&body)
    }
}

fn transport_error(error: ureq::Error) -> ServiceError {
    match error {
        ureq::Error::StatusCode(code) => ServiceError::Status { code },
        other => ServiceError::Transport {
            reason: other.to_string(),
        },
    }
}

/// Content of the first choice of a chat-completions response body
pub fn parse_completion(body: &str) -> Result<String, ServiceError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::Parse {
            reason: e.to_string(),
        })?;
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| ServiceError::Parse {
            reason: "response contained no choices".to_string(),
        })
}
