//! Orchestrator — the agent loop for one user utterance.
//!
//! Per turn:
//! 1. **Ask** — the user text goes to the session's model conversation
//! 2. **Execute** — each requested tool call is reported, dispatched, reported
//!    again, and its result fed back into the session, strictly in order
//! 3. **Answer** — once the model stops requesting tools, its text is the reply
//!
//! Failures never escape a turn: any session or model error becomes
//! [`APOLOGY_TEXT`], and an empty or cut-off answer becomes [`FALLBACK_TEXT`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::inference::types::{ToolCall, ToolDefinition};
use crate::inference::{AgentSettings, ChatModel};

use super::conversation::{ConversationSession, SessionState, TurnOutcome};
use super::errors::AgentError;
use super::record_store::RecordStore;
use super::tool_router::ToolRouter;
use super::tools::{tool_definitions, SYSTEM_INSTRUCTION};
use super::types::{Message, Sender, ToolResponse};

// ─── Constants ──────────────────────────────────────────────────────────────

/// Reply when the model or session fails mid-turn.
pub const APOLOGY_TEXT: &str =
    "Sorry, an error occurred while processing your request with the AI system.";

/// Reply when the model finishes without any text.
pub const FALLBACK_TEXT: &str = "Request processed, but no text response was returned.";

/// Maximum tool-call batches executed per user turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

/// Result recorded for calls left unexecuted when the round cap is hit.
const ROUND_LIMIT_REASON: &str = "Tool call skipped: tool round limit reached for this turn.";

// ─── Observer ───────────────────────────────────────────────────────────────

/// Receives tool events as a turn progresses.
///
/// `on_tool_call` fires before the call is dispatched; `on_tool_result` fires
/// after it completes, before the result is sent back to the model.
pub trait TurnObserver {
    fn on_tool_call(&mut self, call: &ToolCall);
    fn on_tool_result(&mut self, response: &ToolResponse);
}

/// Ignores every event.
impl TurnObserver for () {
    fn on_tool_call(&mut self, _call: &ToolCall) {}
    fn on_tool_result(&mut self, _response: &ToolResponse) {}
}

/// Adapts a pair of closures into a [`TurnObserver`].
pub struct CallbackObserver<C, R> {
    on_call: C,
    on_result: R,
}

impl<C, R> CallbackObserver<C, R>
where
    C: FnMut(&ToolCall),
    R: FnMut(&ToolResponse),
{
    pub fn new(on_call: C, on_result: R) -> Self {
        Self { on_call, on_result }
    }
}

impl<C, R> TurnObserver for CallbackObserver<C, R>
where
    C: FnMut(&ToolCall),
    R: FnMut(&ToolResponse),
{
    fn on_tool_call(&mut self, call: &ToolCall) {
        (self.on_call)(call)
    }

    fn on_tool_result(&mut self, response: &ToolResponse) {
        (self.on_result)(response)
    }
}

// ─── Orchestrator ───────────────────────────────────────────────────────────

struct SessionEntry {
    session: ConversationSession,
    transcript: Vec<Message>,
}

/// Drives conversations between the user, the model, and the tools.
///
/// Sessions are created on first use of a session id. Turns on one
/// orchestrator run one at a time (`&mut self`).
pub struct Orchestrator {
    model: Box<dyn ChatModel>,
    router: ToolRouter,
    system_prompt: String,
    tools: Vec<ToolDefinition>,
    max_tool_rounds: usize,
    sessions: HashMap<String, SessionEntry>,
}

impl Orchestrator {
    pub fn new(model: Box<dyn ChatModel>, router: ToolRouter) -> Self {
        Self {
            model,
            router,
            system_prompt: SYSTEM_INSTRUCTION.to_string(),
            tools: tool_definitions(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            sessions: HashMap::new(),
        }
    }

    /// Build from the `agent` section of the config file.
    pub fn from_settings(
        model: Box<dyn ChatModel>,
        store: Arc<RecordStore>,
        settings: &AgentSettings,
    ) -> Self {
        let router = ToolRouter::with_latency(store, settings.tool_latency());
        let mut orchestrator =
            Self::new(model, router).with_max_tool_rounds(settings.max_tool_rounds as usize);
        if let Some(ref prompt) = settings.system_prompt {
            orchestrator = orchestrator.with_system_prompt(prompt.clone());
        }
        orchestrator
    }

    /// Applies to sessions created after this call.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        self.router.store()
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Messages shown to the user for `session_id`, oldest first.
    pub fn transcript(&self, session_id: &str) -> &[Message] {
        self.sessions
            .get(session_id)
            .map(|e| e.transcript.as_slice())
            .unwrap_or(&[])
    }

    pub fn session_state(&self, session_id: &str) -> Option<SessionState> {
        self.sessions.get(session_id).map(|e| e.session.state())
    }

    // ─── Turn ───────────────────────────────────────────────────────────

    /// Run one user utterance to completion and return the reply text.
    pub async fn submit_user_turn(
        &mut self,
        session_id: &str,
        text: &str,
        observer: &mut dyn TurnObserver,
    ) -> String {
        let entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                session: ConversationSession::new(
                    session_id,
                    self.system_prompt.clone(),
                    self.tools.clone(),
                ),
                transcript: Vec::new(),
            });

        tracing::info!(session_id, text_len = text.len(), "=== USER TURN ===");
        entry.transcript.push(Message::user(text));

        let mut reply = Message::new(Sender::Model);
        let outcome = run_turn(
            &mut entry.session,
            self.model.as_mut(),
            &self.router,
            self.max_tool_rounds,
            text,
            observer,
            &mut reply,
        )
        .await;

        let final_text = match outcome {
            Ok(text) if text.trim().is_empty() => FALLBACK_TEXT.to_string(),
            Ok(text) => text,
            Err(e) => {
                tracing::error!(session_id, error = %e, "turn failed, replying with apology");
                entry.session.abandon_pending(&e.to_string());
                APOLOGY_TEXT.to_string()
            }
        };

        if let Err(e) = reply.finalize(final_text.clone()) {
            tracing::warn!(session_id, error = %e, "reply message already finalized");
        }
        tracing::info!(
            session_id,
            tool_calls = reply.tool_calls.len(),
            reply_len = final_text.len(),
            "=== TURN COMPLETE ==="
        );
        entry.transcript.push(reply);
        final_text
    }
}

/// The loop proper. Returns the model's final text (possibly empty).
async fn run_turn(
    session: &mut ConversationSession,
    model: &mut dyn ChatModel,
    router: &ToolRouter,
    max_tool_rounds: usize,
    text: &str,
    observer: &mut dyn TurnObserver,
    reply: &mut Message,
) -> Result<String, AgentError> {
    let mut outcome = session.send_user_turn(model, text).await?;
    let mut round = 0;

    loop {
        let calls = match outcome {
            TurnOutcome::Final { text } => return Ok(text),
            TurnOutcome::ToolCalls { calls } => calls,
        };

        if round >= max_tool_rounds {
            tracing::warn!(
                session_id = session.id(),
                round,
                max_tool_rounds,
                "tool round limit reached, ending turn"
            );
            session.abandon_pending(ROUND_LIMIT_REASON);
            return Ok(String::new());
        }

        tracing::info!(
            session_id = session.id(),
            round,
            tool_names = ?calls.iter().map(|tc| tc.name.as_str()).collect::<Vec<_>>(),
            "=== TOOL ROUND ==="
        );

        let mut next = None;
        for call in calls {
            observer.on_tool_call(&call);
            reply.push_tool_call(call.clone())?;

            let result = router.dispatch(&call).await;
            let response = ToolResponse {
                name: call.name,
                call_id: call.id,
                result,
            };

            observer.on_tool_result(&response);
            reply.push_tool_result(response.clone())?;

            next = session.send_tool_result(model, &response).await?;
        }

        outcome = match next {
            Some(outcome) => outcome,
            None => {
                return Err(AgentError::InvalidSessionState {
                    session_id: session.id().to_string(),
                    operation: "continue the turn",
                    state: "awaiting tool results",
                })
            }
        };
        round += 1;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
