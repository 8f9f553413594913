//! OpenAI-compatible chat completions (OpenAI, OpenRouter, local servers)

use crate::*;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

/// Provider for any endpoint speaking the `/chat/completions` protocol
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
    is_openrouter: bool,
}

impl OpenAiProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        let api_key = api_key.into();
        let is_openrouter = api_key.starts_with("sk-or-")
            || api_base
                .as_ref()
                .map(|b| b.contains("openrouter"))
                .unwrap_or(false);

        let api_base = api_base.unwrap_or_else(|| {
            if is_openrouter {
                "https://openrouter.ai/api/v1".to_string()
            } else {
                "https://api.openai.com/v1".to_string()
            }
        });

        let default_model = default_model.unwrap_or_else(|| {
            if is_openrouter {
                "openai/gpt-5-mini".to_string()
            } else {
                "gpt-5-mini".to_string()
            }
        });

        Self {
            client: Client::new(),
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            default_model,
            is_openrouter,
        }
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let messages: Vec<serde_json::Value> = params
            .messages
            .iter()
            .map(|m| json!({ "role": &m.role, "content": &m.content }))
            .collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
        });

        if let Some(max_tokens) = params.max_tokens {
            // OpenAI's reasoning models only accept the newer field name
            let field = if self.is_openrouter {
                "max_tokens"
            } else {
                "max_completion_tokens"
            };
            body[field] = json!(max_tokens);
        }
        if let Some(temperature) = params.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(format) = &params.response_format {
            body["response_format"] = format.to_value();
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse> {
        let choice = json["choices"]
            .get(0)
            .ok_or(ProviderError::InvalidResponse)?;
        let message = &choice["message"];

        if let Some(refusal) = message["refusal"].as_str() {
            return Err(ProviderError::Refused(refusal.to_string()));
        }

        let content = message["content"].as_str().map(|s| s.to_string());
        let finish_reason = choice["finish_reason"]
            .as_str()
            .unwrap_or("stop")
            .to_string();

        let usage = if let Some(usage) = json["usage"].as_object() {
            let field = |name: &str| usage.get(name).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            Usage {
                prompt_tokens: field("prompt_tokens"),
                completion_tokens: field("completion_tokens"),
                total_tokens: field("total_tokens"),
            }
        } else {
            Usage::default()
        };

        Ok(ChatResponse {
            content,
            finish_reason,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl Provider for OpenAiProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        if !self.is_configured() {
            return Err(ProviderError::NoApiKey);
        }

        trace!("POST {}/chat/completions", self.api_base);

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(&params);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }
            let error = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
                .unwrap_or_else(|| format!("HTTP {}: {}", status.as_u16(), text.trim()));
            return Err(ProviderError::Api(error));
        }

        let json: serde_json::Value = serde_json::from_str(&text)?;
        let response = self.parse_response(json)?;

        debug!(
            "chat completion: finish_reason={} tokens={}",
            response.finish_reason, response.usage.total_tokens
        );

        Ok(response)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(messages: Vec<Message>) -> ChatParams {
        ChatParams {
            model: "gpt-5-mini".to_string(),
            messages,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_with_openrouter_key() {
        let provider = OpenAiProvider::new("sk-or-test123", None, None);
        assert!(provider.is_openrouter);
        assert_eq!(provider.api_base, "https://openrouter.ai/api/v1");
        assert_eq!(provider.default_model, "openai/gpt-5-mini");
    }

    #[test]
    fn test_new_with_openai_key() {
        let provider = OpenAiProvider::new("sk-openai123", None, None);
        assert!(!provider.is_openrouter);
        assert_eq!(provider.api_base, "https://api.openai.com/v1");
        assert_eq!(provider.default_model, "gpt-5-mini");
    }

    #[test]
    fn test_new_with_custom_base() {
        let provider = OpenAiProvider::new(
            "some-key",
            Some("https://custom.openrouter.ai/api/".to_string()),
            Some("custom/model".to_string()),
        );
        assert!(provider.is_openrouter);
        assert_eq!(provider.api_base, "https://custom.openrouter.ai/api");
        assert_eq!(provider.default_model(), "custom/model");
    }

    #[test]
    fn test_is_configured() {
        assert!(OpenAiProvider::new("key", None, None).is_configured());
        assert!(!OpenAiProvider::new("", None, None).is_configured());
    }

    #[test]
    fn test_build_request_basic() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        let request = provider.build_request(&params(vec![
            Message::system("You are helpful"),
            Message::user("Hello"),
        ]));

        assert_eq!(request["model"], "gpt-5-mini");
        assert!(request.get("temperature").is_none());
        assert!(request.get("max_completion_tokens").is_none());
        assert!(request.get("response_format").is_none());

        let messages = request["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "Hello");
    }

    #[test]
    fn test_build_request_falls_back_to_default_model() {
        let provider = OpenAiProvider::new("sk-test", None, Some("fallback".to_string()));
        let request = provider.build_request(&ChatParams::default());
        assert_eq!(request["model"], "fallback");
    }

    #[test]
    fn test_build_request_token_limit_field() {
        let mut p = params(vec![Message::user("hi")]);
        p.max_tokens = Some(512);
        p.temperature = Some(0.5);

        let openai = OpenAiProvider::new("sk-test", None, None).build_request(&p);
        assert_eq!(openai["max_completion_tokens"], 512);
        assert!(openai.get("max_tokens").is_none());
        assert_eq!(openai["temperature"], 0.5);

        let openrouter = OpenAiProvider::new("sk-or-test", None, None).build_request(&p);
        assert_eq!(openrouter["max_tokens"], 512);
    }

    #[test]
    fn test_build_request_with_response_format() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        let mut p = params(vec![Message::user("hi")]);
        p.response_format = Some(ResponseFormat::json_schema(
            "agent_step",
            json!({ "type": "object" }),
        ));

        let request = provider.build_request(&p);
        assert_eq!(request["response_format"]["type"], "json_schema");
        assert_eq!(request["response_format"]["json_schema"]["name"], "agent_step");
    }

    #[test]
    fn test_parse_response_simple() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        let response = provider
            .parse_response(json!({
                "choices": [{
                    "message": { "role": "assistant", "content": "{\"step\":\"PLAN\"}" },
                    "finish_reason": "stop"
                }],
                "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
            }))
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("{\"step\":\"PLAN\"}"));
        assert_eq!(response.finish_reason, "stop");
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[test]
    fn test_parse_response_missing_usage_and_finish_reason() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        let response = provider
            .parse_response(json!({ "choices": [{ "message": { "content": "x" } }] }))
            .unwrap();

        assert_eq!(response.finish_reason, "stop");
        assert_eq!(response.usage.prompt_tokens, 0);
    }

    #[test]
    fn test_parse_response_null_content() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        let response = provider
            .parse_response(json!({ "choices": [{ "message": { "content": null } }] }))
            .unwrap();
        assert!(response.content.is_none());
    }

    #[test]
    fn test_parse_response_refusal() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        let result = provider.parse_response(json!({
            "choices": [{ "message": { "content": null, "refusal": "I can't help with that" } }]
        }));
        assert!(matches!(result, Err(ProviderError::Refused(r)) if r == "I can't help with that"));
    }

    #[test]
    fn test_parse_response_empty_choices() {
        let provider = OpenAiProvider::new("sk-test", None, None);
        let result = provider.parse_response(json!({ "choices": [] }));
        assert!(matches!(result, Err(ProviderError::InvalidResponse)));

        let result = provider.parse_response(json!({ "usage": {} }));
        assert!(matches!(result, Err(ProviderError::InvalidResponse)));
    }

    #[tokio::test]
    async fn test_chat_without_key_fails_fast() {
        let provider = OpenAiProvider::new("", None, None);
        let result = provider.chat(params(vec![Message::user("hi")])).await;
        assert!(matches!(result, Err(ProviderError::NoApiKey)));
    }
}
