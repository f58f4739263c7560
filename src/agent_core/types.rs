//! Shared types for the agent core.
//!
//! Transcript messages and tool results used across the ToolRouter, the
//! ConversationSession, and the Orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::inference::types::ToolCall;

use super::errors::AgentError;

// ─── Tool Results ───────────────────────────────────────────────────────────

/// Outcome class of a tool execution. Tools never fail at the Rust level;
/// failure lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    NotFound,
    Error,
}

/// Payload returned by a tool and sent back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Free-text answer (knowledge-base lookups).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ToolResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            message: Some(message.into()),
            data: None,
            content: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::NotFound,
            message: Some(message.into()),
            data: None,
            content: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            message: Some(message.into()),
            data: None,
            content: None,
        }
    }

    /// A success carrying only `data`.
    pub fn with_data(data: serde_json::Value) -> Self {
        Self {
            status: ToolStatus::Success,
            message: None,
            data: Some(data),
            content: None,
        }
    }

    /// A success carrying only free-text `content`.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            message: None,
            data: None,
            content: Some(content.into()),
        }
    }

    /// Attach `data` to an existing result.
    pub fn and_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// JSON form sent to the model.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A tool result paired with the call it answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    /// Name of the tool that produced the result.
    pub name: String,
    pub call_id: String,
    pub result: ToolResult,
}

// ─── Transcript Messages ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Model,
}

/// One entry of the transcript shown to the user.
///
/// Tool calls and results are append-only. `finalize` sets the text exactly
/// once; afterwards the message is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResponse>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    finalized: bool,
}

impl Message {
    /// A pending message with no text yet.
    pub fn new(sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            text: None,
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            timestamp: Utc::now(),
            finalized: false,
        }
    }

    /// A user message, finalized on creation.
    pub fn user(text: impl Into<String>) -> Self {
        let mut msg = Self::new(Sender::User);
        msg.text = Some(text.into());
        msg.finalized = true;
        msg
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn push_tool_call(&mut self, call: ToolCall) -> Result<(), AgentError> {
        self.ensure_open()?;
        self.tool_calls.push(call);
        Ok(())
    }

    pub fn push_tool_result(&mut self, response: ToolResponse) -> Result<(), AgentError> {
        self.ensure_open()?;
        self.tool_results.push(response);
        Ok(())
    }

    /// Set the final text.
    pub fn finalize(&mut self, text: impl Into<String>) -> Result<(), AgentError> {
        self.ensure_open()?;
        self.text = Some(text.into());
        self.finalized = true;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), AgentError> {
        if self.finalized {
            return Err(AgentError::MessageFinalized {
                message_id: self.id.clone(),
            });
        }
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
