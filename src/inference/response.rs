//! Chat completion response parsing.
//!
//! Normalizes a non-streaming OpenAI-style response body into a
//! [`ModelReply`]: assistant text plus any native JSON tool calls.

use serde::Deserialize;
use uuid::Uuid;

use super::errors::InferenceError;
use super::types::{ModelReply, ToolCall};

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    tool_calls: Option<Vec<CompletionToolCall>>,
}

#[derive(Deserialize)]
struct CompletionToolCall {
    id: Option<String>,
    function: CompletionFunction,
}

#[derive(Deserialize)]
struct CompletionFunction {
    name: String,
    /// JSON-encoded argument object. Some gateways omit it for no-arg calls.
    #[serde(default)]
    arguments: Option<String>,
}

/// Generate an id for a tool call the model returned without one.
pub fn generate_call_id() -> String {
    format!("call_{}", Uuid::new_v4())
}

/// Parse a non-streaming chat completion body.
pub fn parse_completion_response(body: &str) -> Result<ModelReply, InferenceError> {
    let resp: CompletionResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::MalformedResponse {
            reason: format!("failed to parse completion response: {e}"),
        })?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or(InferenceError::MalformedResponse {
            reason: "empty choices array".into(),
        })?;

    let text = choice.message.content.filter(|c| !c.trim().is_empty());

    let mut tool_calls = Vec::new();
    for tc in choice.message.tool_calls.unwrap_or_default() {
        if tc.function.name.is_empty() {
            return Err(InferenceError::ToolCallParseError {
                raw_response: tc.function.arguments.unwrap_or_default(),
                reason: "empty tool name".into(),
            });
        }
        let raw_args = tc.function.arguments.unwrap_or_default();
        let arguments = if raw_args.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&raw_args).map_err(|e| InferenceError::ToolCallParseError {
                raw_response: raw_args.clone(),
                reason: format!("invalid JSON arguments: {e}"),
            })?
        };
        tool_calls.push(ToolCall {
            id: tc.id.filter(|id| !id.is_empty()).unwrap_or_else(generate_call_id),
            name: tc.function.name,
            arguments,
        });
    }

    let finish_reason = if tool_calls.is_empty() {
        choice.finish_reason
    } else {
        Some("tool_calls".into())
    };

    Ok(ModelReply {
        text,
        tool_calls,
        finish_reason,
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
