//! Hugging Face Inference provider.
//!
//! Talks to the router's OpenAI-compatible `/chat/completions` endpoint
//! with a bearer token.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{
        Completion, FinishReason, GenerationOptions, LlmProvider, TokenUsage,
    },
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Lookup;

pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.1-8B-Instruct";

/// Hugging Face provider configuration
#[derive(Clone)]
pub struct HuggingFaceConfig {
    pub token: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for HuggingFaceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceConfig")
            .field("token", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl HuggingFaceConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&crate::process_env)
    }

    /// `HF_TOKEN` is required; `HF_MODEL` and `HF_BASE_URL` are optional.
    pub fn from_lookup(lookup: &Lookup<'_>) -> Result<Self> {
        let token = lookup("HF_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AgentError::Config("HF_TOKEN is not set".into()))?;

        let mut config = Self::new(token);
        if let Some(model) = lookup("HF_MODEL").filter(|m| !m.is_empty()) {
            config.model = model;
        }
        if let Some(url) = lookup("HF_BASE_URL").filter(|u| !u.is_empty()) {
            config.base_url = url;
        }
        Ok(config)
    }
}

/// Chat-completions client for Hugging Face Inference
pub struct HuggingFaceProvider {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HuggingFaceProvider {
    pub fn from_config(config: &HuggingFaceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            client,
        })
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect()
    }

    fn request_body(messages: &[Message], options: &GenerationOptions) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": options.model,
            "messages": Self::to_api_messages(messages),
            "temperature": options.temperature,
            "top_p": options.top_p,
            "max_tokens": options.max_tokens,
            "stream": false,
        });

        if !options.stop_sequences.is_empty() {
            body["stop"] = serde_json::json!(options.stop_sequences);
        }
        body
    }

    fn check_status(status: reqwest::StatusCode) -> Result<()> {
        match status.as_u16() {
            429 => Err(AgentError::RateLimited("Hugging Face Inference".into())),
            401 | 403 => Err(AgentError::Auth(
                "Invalid HF_TOKEN or insufficient permissions".into(),
            )),
            500..=599 => Err(AgentError::ProviderUnavailable(format!(
                "Hugging Face Inference returned {status}"
            ))),
            _ => Ok(()),
        }
    }

    fn into_completion(response: ApiResponse, model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("No choices in response".into()))?;

        let finish_reason = choice.finish_reason.as_deref().map(|r| match r {
            "length" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            "stop" => FinishReason::Stop,
            _ => FinishReason::Error,
        });

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: response.model.unwrap_or_else(|| model.to_string()),
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason,
        })
    }
}

#[async_trait]
impl LlmProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);
        match self.client.get(&url).bearer_auth(&self.token).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!("Hugging Face health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %options.model, messages = messages.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&Self::request_body(messages, options))
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        Self::check_status(status)?;

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Provider returned error");
            return Err(AgentError::Provider(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("Failed to parse response: {e}")))?;

        Self::into_completion(api_response, &options.model)
    }

}

// --- API types ---

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &HashMap<&str, &str>) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |k| vars.get(k).cloned()
    }

    #[test]
    fn test_config_requires_token() {
        let empty = lookup(&HashMap::from([("HF_TOKEN", "  ")]));
        assert!(matches!(HuggingFaceConfig::from_lookup(&empty), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_config_defaults_and_overrides() {
        let config = HuggingFaceConfig::from_lookup(&lookup(&HashMap::from([("HF_TOKEN", "hf_abc")]))).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);

        let config = HuggingFaceConfig::from_lookup(&lookup(&HashMap::from([
            ("HF_TOKEN", "hf_abc"),
            ("HF_MODEL", "Qwen/Qwen2.5-7B-Instruct"),
        ])))
        .unwrap();
        assert_eq!(config.model, "Qwen/Qwen2.5-7B-Instruct");
    }

    #[test]
    fn test_token_not_in_debug_output() {
        let config = HuggingFaceConfig::new("hf_secret");
        assert!(!format!("{config:?}").contains("hf_secret"));
    }

    #[test]
    fn test_request_body() {
        let messages = vec![Message::system("sys"), Message::user("hi")];
        let options = GenerationOptions {
            model: DEFAULT_MODEL.into(),
            ..Default::default()
        };
        let body = HuggingFaceProvider::request_body(&messages, &options);

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["stream"], false);
        assert!(body.get("stop").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "model": "meta-llama/Llama-3.1-8B-Instruct",
            "choices": [{"message": {"role": "assistant", "content": "Action: DONE"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        }"#;
        let response: ApiResponse = serde_json::from_str(raw).unwrap();
        let completion = HuggingFaceProvider::into_completion(response, "fallback").unwrap();

        assert_eq!(completion.content, "Action: DONE");
        assert_eq!(completion.finish_reason, Some(FinishReason::Stop));
        assert_eq!(completion.usage.unwrap().total_tokens, 13);
    }

    #[test]
    fn test_empty_choices_is_error() {
        let response: ApiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            HuggingFaceProvider::into_completion(response, "m"),
            Err(AgentError::Provider(_))
        ));
    }

    #[test]
    fn test_status_mapping() {
        use reqwest::StatusCode;
        assert!(matches!(HuggingFaceProvider::check_status(StatusCode::TOO_MANY_REQUESTS), Err(AgentError::RateLimited(_))));
        assert!(matches!(HuggingFaceProvider::check_status(StatusCode::UNAUTHORIZED), Err(AgentError::Auth(_))));
        assert!(matches!(HuggingFaceProvider::check_status(StatusCode::BAD_GATEWAY), Err(AgentError::ProviderUnavailable(_))));
        assert!(HuggingFaceProvider::check_status(StatusCode::OK).is_ok());
    }
}
