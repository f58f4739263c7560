//! Configuration loading and validation.
//!
//! Reads `config/agent.yaml` and resolves environment variables.
//! Config is the single source of truth for model endpoints, the fallback
//! chain, and the agent loop's tunables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::errors::InferenceError;

/// Config file location relative to the project root.
const CONFIG_RELATIVE_PATH: &str = "config/agent.yaml";

/// Env var that pins the project root (checked before walking upward).
const PROJECT_ROOT_ENV: &str = "HOSPITAL_AGENT_PROJECT_ROOT";

// ─── Public Types ────────────────────────────────────────────────────────────

/// A single model's endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub display_name: String,
    /// Base URL of an OpenAI-compatible API, without `/chat/completions`.
    pub base_url: String,
    /// Model identifier sent in the request. Defaults to the config key.
    #[serde(default)]
    pub model_name: Option<String>,
    /// Bearer token. Usually `${SOME_API_KEY}`; an empty value means none.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl ModelConfig {
    /// The API key, if one is configured and non-empty after interpolation.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    1024
}

/// Tunables for the orchestration loop and the simulated backend.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    /// Artificial latency before every record-store mutation (ms).
    #[serde(default = "default_tool_latency_ms")]
    pub tool_latency_ms: u64,
    /// Maximum model round-trips carrying tool calls within one user turn.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// Start the record store with the demo fixture records.
    #[serde(default = "default_seed_demo_data")]
    pub seed_demo_data: bool,
    /// Replaces the built-in system instruction when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl AgentSettings {
    pub fn tool_latency(&self) -> Duration {
        Duration::from_millis(self.tool_latency_ms)
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            tool_latency_ms: default_tool_latency_ms(),
            max_tool_rounds: default_max_tool_rounds(),
            seed_demo_data: default_seed_demo_data(),
            system_prompt: None,
        }
    }
}

fn default_tool_latency_ms() -> u64 {
    800
}
fn default_max_tool_rounds() -> u32 {
    8
}
fn default_seed_demo_data() -> bool {
    true
}

/// Top-level configuration (mirrors `config/agent.yaml`).
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub active_model: String,
    pub models: HashMap<String, ModelConfig>,
    #[serde(default)]
    pub fallback_chain: Vec<String>,
    #[serde(default)]
    pub agent: AgentSettings,
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate `config/agent.yaml`.
///
/// Checks `HOSPITAL_AGENT_PROJECT_ROOT` first, then searches upward from `start`.
pub fn find_config_path(start: &Path) -> Result<PathBuf, InferenceError> {
    if let Ok(root) = std::env::var(PROJECT_ROOT_ENV) {
        let candidate = PathBuf::from(&root).join(CONFIG_RELATIVE_PATH);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_RELATIVE_PATH);
        if candidate.exists() {
            return Ok(candidate);
        }
        if !dir.pop() {
            break;
        }
    }

    Err(InferenceError::ConfigError {
        reason: format!("could not find {CONFIG_RELATIVE_PATH}"),
    })
}

/// Load and parse the configuration file.
///
/// Performs environment-variable interpolation on `${VAR_NAME}` and
/// `${VAR_NAME:-default}` before parsing.
pub fn load_models_config(path: &Path) -> Result<ModelsConfig, InferenceError> {
    let raw = std::fs::read_to_string(path).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    parse_models_config(&raw)
}

/// Parse configuration text (after env-var interpolation).
pub fn parse_models_config(raw: &str) -> Result<ModelsConfig, InferenceError> {
    let interpolated = interpolate_env_vars(raw);

    let config: ModelsConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| InferenceError::ConfigError {
            reason: format!("failed to parse config: {e}"),
        })?;

    if config.models.is_empty() {
        return Err(InferenceError::ConfigError {
            reason: "no models configured".into(),
        });
    }

    Ok(config)
}

/// Resolve the active model configuration, respecting the fallback chain.
///
/// Returns `(model_key, ModelConfig)` for the first model that exists in the
/// config. Connectivity is checked at request time by the client.
pub fn resolve_active_model(config: &ModelsConfig) -> Result<(String, ModelConfig), InferenceError> {
    if let Some(model) = config.models.get(&config.active_model) {
        return Ok((config.active_model.clone(), model.clone()));
    }

    for key in &config.fallback_chain {
        if let Some(model) = config.models.get(key) {
            return Ok((key.clone(), model.clone()));
        }
    }

    Err(InferenceError::ConfigError {
        reason: format!(
            "active model '{}' not found in config and no fallback available",
            config.active_model
        ),
    })
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve a variable expression like `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> String {
    if let Some(idx) = expr.find(":-") {
        let var_name = &expr[..idx];
        let default = &expr[idx + 2..];
        std::env::var(var_name)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| expand_tilde(default))
    } else {
        std::env::var(expr).unwrap_or_default()
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
