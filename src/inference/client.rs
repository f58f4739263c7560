//! OpenAI-compatible inference client.
//!
//! Sends chat completion requests to the configured endpoint and walks the
//! fallback chain when the current model is unavailable.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use super::config::{ModelConfig, ModelsConfig};
use super::errors::InferenceError;
use super::model::ChatModel;
use super::response::parse_completion_response;
use super::types::{ChatCompletionRequest, ChatMessage, ModelReply, ToolDefinition};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request timeout. Hosted models with a tool catalog routinely take
/// tens of seconds on long conversations.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// Client for the remote language-model endpoint.
pub struct InferenceClient {
    http: HttpClient,
    /// The full configuration (for the fallback chain).
    config: ModelsConfig,
    /// The current model key (e.g., "gemini-flash").
    current_model_key: String,
    current_model: ModelConfig,
    /// Models that have already been tried and failed.
    exhausted_models: Vec<String>,
}

impl InferenceClient {
    /// Create a new inference client from the configuration.
    ///
    /// Resolves the active model. Does NOT check connectivity; that happens
    /// on the first request.
    pub fn from_config(config: ModelsConfig) -> Result<Self, InferenceError> {
        let (key, model) = super::config::resolve_active_model(&config)?;

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: model.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            config,
            current_model_key: key,
            current_model: model,
            exhausted_models: Vec::new(),
        })
    }

    /// The base URL of the current model's endpoint.
    pub fn current_base_url(&self) -> &str {
        &self.current_model.base_url
    }

    /// The display name of the currently selected model.
    pub fn current_model_name(&self) -> &str {
        &self.current_model.display_name
    }

    // ─── Chat Completion ─────────────────────────────────────────────────

    /// Send a chat completion request, falling back through the chain on
    /// retriable failures.
    ///
    /// Once every model in the chain has failed, the error is
    /// `AllModelsUnavailable` listing each attempted model once.
    pub async fn chat_completion(
        &mut self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, InferenceError> {
        for _attempt in 0..=self.remaining_fallbacks() {
            match self.try_request(messages, tools).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retriable() => {
                    tracing::warn!(
                        model = %self.current_model_key,
                        error = %e,
                        "model request failed, trying next fallback"
                    );
                    self.try_next_fallback()?;
                }
                Err(e) => return Err(e),
            }
        }

        Err(InferenceError::AllModelsUnavailable {
            attempted: self.exhausted_models.clone(),
        })
    }

    /// Attempt a single request to the current model.
    async fn try_request(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, InferenceError> {
        let url = format!(
            "{}/chat/completions",
            self.current_model.base_url.trim_end_matches('/')
        );
        let body = self.build_request(messages, tools);

        // Metadata only; the body carries patient details.
        tracing::info!(
            url = %url,
            model = %body.model,
            message_count = body.messages.len(),
            tool_count = body.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            max_tokens = body.max_tokens,
            "=== LLM REQUEST ==="
        );

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = self.current_model.api_key() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout {
                    duration_secs: REQUEST_TIMEOUT.as_secs(),
                }
            } else {
                InferenceError::ConnectionFailed {
                    endpoint: url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| InferenceError::MalformedResponse {
                reason: format!("failed to read response body: {e}"),
            })?;

        let reply = parse_completion_response(&body_text)?;
        tracing::info!(
            model = %self.current_model_key,
            text_len = reply.text.as_ref().map(|t| t.len()).unwrap_or(0),
            tool_calls = reply.tool_calls.len(),
            tool_names = ?reply.tool_calls.iter().map(|tc| tc.name.as_str()).collect::<Vec<_>>(),
            "=== MODEL RESPONSE ==="
        );
        Ok(reply)
    }

    fn build_request(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> ChatCompletionRequest {
        let model_name = self
            .current_model
            .model_name
            .clone()
            .unwrap_or_else(|| self.current_model_key.clone());
        let tools = if tools.is_empty() {
            None
        } else {
            Some(tools.to_vec())
        };

        ChatCompletionRequest {
            model: model_name,
            messages: messages.to_vec(),
            tool_choice: tools.as_ref().map(|_| "auto".to_string()),
            tools,
            temperature: self.current_model.temperature,
            top_p: self.current_model.top_p,
            max_tokens: self.current_model.max_tokens,
            stream: false,
        }
    }

    // ─── Fallback Chain ──────────────────────────────────────────────────

    /// Move to the next model in the fallback chain.
    ///
    /// Returns `Err` if no more fallbacks are available.
    pub fn try_next_fallback(&mut self) -> Result<(), InferenceError> {
        if !self.exhausted_models.contains(&self.current_model_key) {
            self.exhausted_models.push(self.current_model_key.clone());
        }

        for key in &self.config.fallback_chain {
            if self.exhausted_models.contains(key) {
                continue;
            }
            if let Some(model) = self.config.models.get(key) {
                self.current_model_key = key.clone();
                self.current_model = model.clone();
                return Ok(());
            }
        }

        Err(InferenceError::AllModelsUnavailable {
            attempted: self.exhausted_models.clone(),
        })
    }

    /// Number of fallback models not yet tried.
    fn remaining_fallbacks(&self) -> usize {
        self.config
            .fallback_chain
            .iter()
            .filter(|k| {
                !self.exhausted_models.contains(k)
                    && **k != self.current_model_key
                    && self.config.models.contains_key(k.as_str())
            })
            .count()
    }
}

#[async_trait]
impl ChatModel for InferenceClient {
    async fn complete(
        &mut self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, InferenceError> {
        self.chat_completion(messages, tools).await
    }

    fn model_name(&self) -> &str {
        self.current_model_name()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
