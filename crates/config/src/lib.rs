//! Configuration management for stepwise
//!
//! Loads and saves the assistant's settings from `~/.stepwise/config.json`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir};

/// Environment variable checked first for the model API key
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable checked when `OPENAI_API_KEY` is unset
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Errors raised while reading or writing configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config not found: {0}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Credentials for one OpenAI-compatible endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// All model endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub openrouter: ProviderConfig,
}

/// Step loop parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound on model queries per user turn
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    /// How many malformed steps are fed back to the model before the turn fails.
    /// Zero aborts on the first one.
    #[serde(default)]
    pub schema_retries: u32,
    /// Ask the endpoint for schema-constrained output (`json_schema`) rather than
    /// plain `json_object` mode.
    #[serde(default = "default_structured_output")]
    pub structured_output: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            model: default_model(),
            max_steps: default_max_steps(),
            model_timeout_secs: default_model_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            schema_retries: 0,
            structured_output: default_structured_output(),
            max_tokens: None,
            temperature: None,
        }
    }
}

fn default_workspace() -> String {
    ".".to_string()
}

fn default_model() -> String {
    "gpt-5-mini".to_string()
}

fn default_max_steps() -> u32 {
    25
}

fn default_model_timeout_secs() -> u64 {
    120
}

fn default_tool_timeout_secs() -> u64 {
    120
}

fn default_structured_output() -> bool {
    true
}

/// Shell tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    #[serde(default = "default_exec_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_output")]
    pub max_output: usize,
    /// Commands containing any of these (case-insensitive) are refused
    #[serde(default = "default_deny_patterns")]
    pub deny_patterns: Vec<String>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_exec_timeout_secs(),
            max_output: default_max_output(),
            deny_patterns: default_deny_patterns(),
        }
    }
}

fn default_exec_timeout_secs() -> u64 {
    30
}

fn default_max_output() -> usize {
    10_000
}

fn default_deny_patterns() -> Vec<String> {
    ["rm -rf /", "mkfs", "dd if=", "format c:", ":(){:|:&};:"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Code search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_matches: default_max_matches(),
        }
    }
}

fn default_max_matches() -> usize {
    50
}

/// Tool registry settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    /// Tool names left out of the registry
    #[serde(default)]
    pub disabled: Vec<String>,
    #[serde(default)]
    pub restrict_to_workspace: bool,
    #[serde(default)]
    pub exec: ExecConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from a specific location, falling back to defaults when absent
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no config at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("loading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("writing config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Directory the tools resolve relative paths against
    pub fn workspace_path(&self) -> PathBuf {
        let path = &self.agent.workspace;
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        } else if path == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
        PathBuf::from(path)
    }

    /// API key, environment first, then the config file
    pub fn api_key(&self) -> Option<String> {
        env_key(OPENAI_API_KEY_ENV)
            .or_else(|| env_key(OPENROUTER_API_KEY_ENV))
            .or_else(|| self.file_api_key())
    }

    /// API key from the config file only
    pub fn file_api_key(&self) -> Option<String> {
        [&self.providers.openai, &self.providers.openrouter]
            .into_iter()
            .map(|p| p.api_key.clone())
            .find(|key| !key.is_empty())
    }

    /// Custom endpoint, if one is configured
    pub fn api_base(&self) -> Option<String> {
        [&self.providers.openai, &self.providers.openrouter]
            .into_iter()
            .filter_map(|p| p.api_base.clone())
            .find(|base| !base.is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn default_model(&self) -> String {
        self.agent.model.clone()
    }

    /// Whether a tool is left out by `tools.disabled`
    pub fn is_tool_disabled(&self, name: &str) -> bool {
        self.tools.disabled.iter().any(|d| d == name)
    }
}

fn env_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Write the default config if none exists and return what is on disk
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("config already exists at {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("config written to {:?}", config_path);
    }

    Config::load().await
}
