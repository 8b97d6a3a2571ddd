//! The rewrite gateway: the external text-to-text collaborator boundary.
//!
//! The pipeline treats the rewriting step as an opaque function from
//! decomposed text (placeholders embedded) to rewritten text. Everything the
//! core assumes about it is captured by the [`RewriteGateway`] trait:
//!
//! * one synchronous call, one result;
//! * any transport/service failure surfaces as a single
//!   [`ImproveError::GatewayFailed`];
//! * placeholder tokens are expected back verbatim **by contract** — the core
//!   does not verify this (a placeholder the gateway mangles simply loses its
//!   image, degrading per the recomposer's best-effort rules);
//! * no retry logic lives at this layer. Retry/backoff, if desired, belongs
//!   to the caller.
//!
//! [`OpenAiGateway`] is the shipped implementation, speaking the
//! OpenAI-compatible `/chat/completions` protocol over blocking reqwest.

use crate::config::ImproveConfig;
use crate::error::ImproveError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Opaque text-to-text rewriting service.
pub trait RewriteGateway {
    /// Rewrite `text` under `system_prompt`, returning the rewritten text.
    fn rewrite(&self, system_prompt: &str, text: &str) -> Result<String, ImproveError>;
}

/// Blanket impl so tests and embedders can pass a plain closure as a gateway.
impl<F> RewriteGateway for F
where
    F: Fn(&str, &str) -> Result<String, ImproveError>,
{
    fn rewrite(&self, system_prompt: &str, text: &str) -> Result<String, ImproveError> {
        self(system_prompt, text)
    }
}

// ── OpenAI-compatible implementation ─────────────────────────────────────

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Rewrite gateway backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiGateway {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl OpenAiGateway {
    /// Create a gateway from the run configuration and an API key.
    pub fn new(api_key: impl Into<String>, config: &ImproveConfig) -> Result<Self, ImproveError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, config)
    }

    /// Create a gateway from the environment: `OPENAI_API_KEY` (required) and
    /// `OPENAI_BASE_URL` (optional, defaults to [`DEFAULT_BASE_URL`]).
    pub fn from_env(config: &ImproveConfig) -> Result<Self, ImproveError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            ImproveError::InvalidConfig("OPENAI_API_KEY is not set".to_string())
        })?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(api_key, base_url, config)
    }

    /// Create a gateway against a non-default endpoint (Azure, local proxy,
    /// or a mock server in tests).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        config: &ImproveConfig,
    ) -> Result<Self, ImproveError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.gateway_timeout_secs))
            .build()
            .map_err(|e| ImproveError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl RewriteGateway for OpenAiGateway {
    fn rewrite(&self, system_prompt: &str, text: &str) -> Result<String, ImproveError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(model = %self.model, chars = text.len(), "Calling rewrite gateway");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| ImproveError::GatewayFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ImproveError::GatewayFailed {
                message: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: ChatResponse =
            response.json().map_err(|e| ImproveError::GatewayFailed {
                message: format!("malformed response: {e}"),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ImproveError::GatewayFailed {
                message: "response contained no completion".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_acts_as_gateway() {
        let gateway = |_sys: &str, text: &str| -> Result<String, ImproveError> {
            Ok(text.to_uppercase())
        };
        let out = gateway.rewrite("prompt", "hello").unwrap();
        assert_eq!(out, "HELLO");
    }

    #[test]
    fn chat_request_serialises_in_message_order() {
        let req = ChatRequest {
            model: "gpt-4",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "s",
                },
                ChatMessage {
                    role: "user",
                    content: "u",
                },
            ],
            temperature: 0.7,
            max_tokens: 2048,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 2048);
    }

    #[test]
    fn chat_response_parses_content() {
        let json = r#"{"choices":[{"message":{"content":"better text"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("better text")
        );
    }
}
