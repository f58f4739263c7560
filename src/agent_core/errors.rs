//! Agent Core error types.

use thiserror::Error;

use crate::inference::InferenceError;

/// Errors that can occur during agent core operations.
///
/// None of these reach the UI collaborator: the orchestration loop converts
/// them into its fixed apology text.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The language-model round-trip failed.
    #[error("model request failed: {0}")]
    Inference(#[from] InferenceError),

    /// A tool result named a call id the session is not waiting on.
    #[error("no pending tool call with id '{call_id}' in session '{session_id}'")]
    UnknownToolCall { session_id: String, call_id: String },

    /// An operation was attempted in the wrong session state.
    #[error("session '{session_id}' cannot {operation} while {state}")]
    InvalidSessionState {
        session_id: String,
        operation: &'static str,
        state: &'static str,
    },

    /// A transcript message was finalized twice.
    #[error("message '{message_id}' is already finalized")]
    MessageFinalized { message_id: String },

    /// Serialization error.
    #[error("serialization error: {reason}")]
    SerializationError { reason: String },
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::SerializationError {
            reason: e.to_string(),
        }
    }
}
