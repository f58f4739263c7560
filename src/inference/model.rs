//! `ChatModel` — the seam between the conversation session and whatever
//! answers its requests.
//!
//! [`InferenceClient`](super::InferenceClient) is the production
//! implementation. Tests substitute scripted models.

use async_trait::async_trait;

use super::errors::InferenceError;
use super::types::{ChatMessage, ModelReply, ToolDefinition};

/// One request/response exchange with a language model.
#[async_trait]
pub trait ChatModel: Send {
    /// Send the full conversation history plus the tool catalog and return
    /// the model's next reply.
    async fn complete(
        &mut self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, InferenceError>;

    /// Human-readable name for logs.
    fn model_name(&self) -> &str;
}
