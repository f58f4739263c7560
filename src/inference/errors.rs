//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Structured logging
//! is the caller's responsibility; these types carry the context needed to build
//! meaningful log entries.

use thiserror::Error;

/// Errors that can occur while talking to the language-model endpoint.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the model endpoint failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },

    /// The model endpoint did not respond within the configured timeout.
    #[error("inference timeout after {duration_secs}s")]
    Timeout {
        duration_secs: u64,
    },

    /// Failed to parse a tool call from the model's response.
    #[error("tool call parse error: {reason}")]
    ToolCallParseError {
        raw_response: String,
        reason: String,
    },

    /// Every model in the fallback chain was unavailable.
    #[error("all models unavailable (tried: {})", attempted.join(", "))]
    AllModelsUnavailable {
        attempted: Vec<String>,
    },

    /// Non-2xx HTTP response from the model endpoint.
    #[error("HTTP {status}: {body}")]
    HttpError {
        status: u16,
        body: String,
    },

    /// The response body was not a chat completion.
    #[error("malformed response: {reason}")]
    MalformedResponse {
        reason: String,
    },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError {
        reason: String,
    },
}

impl InferenceError {
    /// Whether this error should move the client to the next model in the
    /// fallback chain.
    ///
    /// 404 means the model is not served by that endpoint; 429 is a quota
    /// rejection that another provider may not share.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            InferenceError::ConnectionFailed { .. }
                | InferenceError::Timeout { .. }
                | InferenceError::HttpError { status: 404, .. }
                | InferenceError::HttpError { status: 429, .. }
                | InferenceError::HttpError { status: 500, .. }
                | InferenceError::HttpError { status: 502..=504, .. }
        )
    }
}
