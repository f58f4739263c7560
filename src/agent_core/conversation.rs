//! ConversationSession — the running dialogue with the language model.
//!
//! Responsibilities:
//! - Hold the model-facing history (system instruction, user turns,
//!   assistant tool calls, tool results)
//! - Track which tool calls of the current batch are still unanswered
//! - Round-trip to the model once every call of a batch has a result
//!
//! State machine:
//!
//! ```text
//! Uninitialized --initialize--> Ready --send_user_turn--> Ready (final text)
//!                                  \--------------------> AwaitingToolResults
//! AwaitingToolResults --send_tool_result (last of batch)--> Ready | AwaitingToolResults
//! ```

use std::collections::HashSet;

use crate::inference::response::generate_call_id;
use crate::inference::types::{ChatMessage, ModelReply, ToolCall, ToolDefinition};
use crate::inference::ChatModel;

use super::errors::AgentError;
use super::types::ToolResponse;

// ─── Session state ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    AwaitingToolResults,
}

impl SessionState {
    fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Ready => "ready",
            SessionState::AwaitingToolResults => "awaiting tool results",
        }
    }
}

/// What the model produced for a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The model is done. `text` may be empty.
    Final { text: String },
    /// The model wants these tools run, in order.
    ToolCalls { calls: Vec<ToolCall> },
}

// ─── ConversationSession ────────────────────────────────────────────────────

pub struct ConversationSession {
    id: String,
    system_prompt: String,
    tools: Vec<ToolDefinition>,
    history: Vec<ChatMessage>,
    state: SessionState,
    /// Call ids of the current batch not yet answered, in issue order.
    pending: Vec<String>,
}

impl ConversationSession {
    pub fn new(
        id: impl Into<String>,
        system_prompt: impl Into<String>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self {
            id: id.into(),
            system_prompt: system_prompt.into(),
            tools,
            history: Vec::new(),
            state: SessionState::Uninitialized,
            pending: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The model-facing history, system instruction first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Call ids still awaiting a result.
    pub fn pending_call_ids(&self) -> &[String] {
        &self.pending
    }

    /// Install the system instruction. Does nothing after the first call.
    pub fn initialize(&mut self) {
        if self.state != SessionState::Uninitialized {
            return;
        }
        self.history.push(ChatMessage::system(self.system_prompt.clone()));
        self.state = SessionState::Ready;
        tracing::debug!(session_id = %self.id, "session initialized");
    }

    // ─── Turns ──────────────────────────────────────────────────────────

    /// Send a user utterance and return the model's response.
    ///
    /// Initializes the session on first use.
    pub async fn send_user_turn(
        &mut self,
        model: &mut dyn ChatModel,
        text: &str,
    ) -> Result<TurnOutcome, AgentError> {
        self.initialize();
        self.require_state(SessionState::Ready, "accept a user turn")?;

        self.history.push(ChatMessage::user(text));
        self.round_trip(model).await
    }

    /// Record the result for one pending call.
    ///
    /// Returns `None` while other calls of the batch are still unanswered,
    /// since a chat-completions history must answer every call of an
    /// assistant message before the model is asked again. When this was the
    /// last one, the session asks the model for its next
    /// response and returns it.
    pub async fn send_tool_result(
        &mut self,
        model: &mut dyn ChatModel,
        response: &ToolResponse,
    ) -> Result<Option<TurnOutcome>, AgentError> {
        self.require_state(SessionState::AwaitingToolResults, "accept a tool result")?;

        let Some(index) = self.pending.iter().position(|id| *id == response.call_id) else {
            return Err(AgentError::UnknownToolCall {
                session_id: self.id.clone(),
                call_id: response.call_id.clone(),
            });
        };
        self.pending.remove(index);
        self.history.push(ChatMessage::tool_result(
            &response.call_id,
            &response.result.to_value(),
        ));

        if !self.pending.is_empty() {
            return Ok(None);
        }
        self.round_trip(model).await.map(Some)
    }

    /// Answer every pending call with an error result and return to `Ready`
    /// without contacting the model.
    ///
    /// Used when the caller stops executing a batch, so the history stays
    /// well-formed for the next turn.
    pub fn abandon_pending(&mut self, reason: &str) {
        if self.pending.is_empty() {
            return;
        }
        let skipped = serde_json::json!({ "status": "error", "message": reason });
        for call_id in std::mem::take(&mut self.pending) {
            self.history.push(ChatMessage::tool_result(&call_id, &skipped));
        }
        self.state = SessionState::Ready;
        tracing::debug!(session_id = %self.id, reason, "pending tool calls abandoned");
    }

    // ─── Internals ──────────────────────────────────────────────────────

    async fn round_trip(&mut self, model: &mut dyn ChatModel) -> Result<TurnOutcome, AgentError> {
        let reply = match model.complete(&self.history, &self.tools).await {
            Ok(reply) => reply,
            Err(e) => {
                // Nothing pending; the next user turn may proceed.
                self.state = SessionState::Ready;
                tracing::error!(
                    session_id = %self.id,
                    model = model.model_name(),
                    error = %e,
                    "model request failed"
                );
                return Err(e.into());
            }
        };

        let ModelReply { text, tool_calls, .. } = reply;
        let calls = normalize_tool_calls(tool_calls);

        self.history.push(ChatMessage::assistant(text.clone(), &calls));

        if calls.is_empty() {
            self.state = SessionState::Ready;
            return Ok(TurnOutcome::Final {
                text: text.unwrap_or_default(),
            });
        }

        self.pending = calls.iter().map(|c| c.id.clone()).collect();
        self.state = SessionState::AwaitingToolResults;
        tracing::debug!(
            session_id = %self.id,
            pending = self.pending.len(),
            "awaiting tool results"
        );
        Ok(TurnOutcome::ToolCalls { calls })
    }

    fn require_state(&self, expected: SessionState, operation: &'static str) -> Result<(), AgentError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(AgentError::InvalidSessionState {
                session_id: self.id.clone(),
                operation,
                state: self.state.as_str(),
            })
        }
    }
}

/// Give every call an id and drop later calls that reuse one.
fn normalize_tool_calls(calls: Vec<ToolCall>) -> Vec<ToolCall> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(calls.len());

    for mut call in calls {
        if call.id.trim().is_empty() {
            call.id = generate_call_id();
        }
        if !seen.insert(call.id.clone()) {
            tracing::warn!(call_id = %call.id, tool = %call.name, "dropping duplicate tool call id");
            continue;
        }
        if !call.arguments.is_object() {
            call.arguments = serde_json::Value::Object(serde_json::Map::new());
        }
        normalized.push(call);
    }
    normalized
}

// ─── Tests ──────────────────────────────────────────────────────────────────
