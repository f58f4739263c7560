//! Shared types for the inference client.
//!
//! These mirror the OpenAI Chat Completions API types, used for both
//! request building and response parsing.

use serde::{Deserialize, Serialize};

// ─── Request Types ───────────────────────────────────────────────────────────

/// A single message in the conversation.
///
/// `content` is serialized as `""` rather than `null` for assistant messages
/// that only carry tool calls; several OpenAI-compatible gateways reject
/// `null` there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(serialize_with = "serialize_content")]
    pub content: Option<String>,
    /// Tool call results are sent back as `tool` role messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Assistant messages may contain tool calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallResponse>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    /// Assistant turn as the model produced it: optional text plus the tool
    /// calls it requested, re-encoded in wire format.
    pub fn assistant(content: Option<String>, tool_calls: &[ToolCall]) -> Self {
        let tool_calls = if tool_calls.is_empty() {
            None
        } else {
            Some(
                tool_calls
                    .iter()
                    .map(|tc| ToolCallResponse {
                        id: tc.id.clone(),
                        r#type: "function".to_string(),
                        function: FunctionCallResponse {
                            name: tc.name.clone(),
                            arguments: serde_json::to_string(&tc.arguments)
                                .unwrap_or_else(|_| "{}".to_string()),
                        },
                    })
                    .collect(),
            )
        };
        Self {
            role: Role::Assistant,
            content,
            tool_call_id: None,
            tool_calls,
        }
    }

    /// A `tool` role message answering the call with `tool_call_id`.
    pub fn tool_result(tool_call_id: &str, result: &serde_json::Value) -> Self {
        // Plain strings go through as-is; anything else is JSON-encoded once.
        let content = match result.as_str() {
            Some(s) => s.to_string(),
            None => serde_json::to_string(result).unwrap_or_default(),
        };
        Self {
            role: Role::Tool,
            content: Some(content),
            tool_call_id: Some(tool_call_id.to_string()),
            tool_calls: None,
        }
    }
}

fn serialize_content<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(s) => serializer.serialize_str(s),
        None => serializer.serialize_str(""),
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Tool definition sent in the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub r#type: String,
    pub function: FunctionDefinition,
}

/// Function definition within a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    pub max_tokens: u32,
    pub stream: bool,
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// A parsed tool call extracted from the model's response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call (generated if the model doesn't provide one).
    pub id: String,
    /// Tool name, e.g. `"medical_scheduling"`.
    pub name: String,
    /// JSON object of arguments.
    #[serde(rename = "args")]
    pub arguments: serde_json::Value,
}

/// Tool call as returned in the OpenAI response format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResponse {
    pub id: String,
    pub r#type: String,
    pub function: FunctionCallResponse,
}

/// Function call details in a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallResponse {
    pub name: String,
    pub arguments: String,
}

/// One complete model reply: either finished text, requested tool calls, or
/// (occasionally) both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    /// Assistant text, `None` when the model produced no text.
    pub text: Option<String>,
    /// Tool calls requested by the model, in the order it listed them.
    pub tool_calls: Vec<ToolCall>,
    /// Why the model stopped: `"stop"`, `"tool_calls"`, `"length"`, ...
    pub finish_reason: Option<String>,
}

impl ModelReply {
    /// A plain text reply with no tool calls.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
            finish_reason: Some("stop".to_string()),
        }
    }

    /// A reply that only requests tool calls.
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            text: None,
            tool_calls: calls,
            finish_reason: Some("tool_calls".to_string()),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
