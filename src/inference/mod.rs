//! Inference Client — OpenAI-compatible API client for the hosted model.
//!
//! This module handles all communication with the model endpoint:
//! - Non-streaming chat completions with a tool catalog
//! - Response parsing into text and tool calls
//! - Fallback chain management
//! - Configuration loading from `config/agent.yaml`
//!
//! The client speaks the OpenAI Chat Completions API, so switching providers
//! is a config change, not a code change.

pub mod client;
pub mod config;
pub mod errors;
pub mod model;
pub mod response;
pub mod types;

// Re-exports for convenience
pub use client::InferenceClient;
pub use config::{AgentSettings, ModelConfig, ModelsConfig};
pub use errors::InferenceError;
pub use model::ChatModel;
pub use types::{ChatMessage, ModelReply, Role, ToolCall, ToolDefinition};
