//! Test doubles shared by the agent core tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::inference::types::{ChatMessage, ModelReply, ToolDefinition};
use crate::inference::{ChatModel, InferenceError};

/// A `ChatModel` that replays a fixed script of replies and records every
/// history it was sent.
pub struct ScriptedModel {
    script: VecDeque<Result<ModelReply, InferenceError>>,
    requests: RequestLog,
}

/// Histories sent to a [`ScriptedModel`], readable after the model has been
/// moved into an orchestrator.
pub type RequestLog = Arc<Mutex<Vec<Vec<ChatMessage>>>>;

impl ScriptedModel {
    pub fn new(script: Vec<Result<ModelReply, InferenceError>>) -> Self {
        Self {
            script: script.into(),
            requests: RequestLog::default(),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_log(&self) -> RequestLog {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &mut self,
        messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ModelReply, InferenceError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.script.pop_front().unwrap_or_else(|| {
            Err(InferenceError::MalformedResponse {
                reason: "script exhausted".to_string(),
            })
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
