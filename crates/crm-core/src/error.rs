//! Error types for crm-core

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Main error type for crm-core
#[derive(Error, Debug)]
pub enum Error {
    /// The chat-completion provider answered with a non-success status
    #[error("LLM API error ({status}): {body}")]
    LlmApi { status: u16, body: String },

    /// The provider answered 2xx but the payload was unusable
    #[error("LLM response error: {0}")]
    LlmResponse(String),

    /// A loopback gateway call made by a tool failed
    #[error("Gateway call failed ({status}): {body}")]
    Gateway { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Detail payload for error envelopes.
    ///
    /// Upstream bodies are returned as JSON when they parse, otherwise the
    /// error message is used.
    pub fn details(&self) -> JsonValue {
        match self {
            Error::LlmApi { body, .. } | Error::Gateway { body, .. } => {
                serde_json::from_str(body).unwrap_or_else(|_| JsonValue::String(body.clone()))
            }
            other => JsonValue::String(other.to_string()),
        }
    }
}

/// Result type alias for crm-core
pub type Result<T> = std::result::Result<T, Error>;
