//! Model providers
//!
//! Chat-completion access to OpenAI-compatible endpoints, with support for
//! schema-constrained (structured) replies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use thiserror::Error;

pub mod openai;

pub use openai::OpenAiProvider;

/// Errors raised while talking to a model endpoint
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed JSON from provider: {0}")]
    Json(#[from] serde_json::Error),

    #[error("provider rejected request: {0}")]
    Api(String),

    #[error("no API key configured")]
    NoApiKey,

    #[error("provider returned no choices")]
    InvalidResponse,

    #[error("rate limited by provider")]
    RateLimited,

    #[error("model refused: {0}")]
    Refused(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Model reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: Option<String>,
    #[serde(default)]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }

    /// Reply carrying no text at all
    pub fn empty() -> Self {
        Self {
            content: None,
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
        }
    }
}

/// Token accounting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One chat message on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Requested reply format
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// Any JSON object
    JsonObject,
    /// A JSON document validated against `schema` by the provider
    JsonSchema { name: String, schema: Value },
}

impl ResponseFormat {
    pub fn json_schema(name: impl Into<String>, schema: Value) -> Self {
        Self::JsonSchema {
            name: name.into(),
            schema,
        }
    }

    /// Wire encoding of the `response_format` request field
    pub fn to_value(&self) -> Value {
        match self {
            Self::JsonObject => serde_json::json!({ "type": "json_object" }),
            Self::JsonSchema { name, schema } => serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": name,
                    "strict": true,
                    "schema": schema
                }
            }),
        }
    }
}

/// Request parameters
#[derive(Debug, Clone, Default)]
pub struct ChatParams {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub response_format: Option<ResponseFormat>,
}

/// A chat-completion endpoint
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse>;
    fn default_model(&self) -> String;
    fn is_configured(&self) -> bool;
}
