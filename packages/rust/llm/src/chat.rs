//! Chat-completion client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use vendorrisk_shared::{ChatMessage, LlmConfig, Result, VendorRiskError};

/// User-Agent string for model API requests.
const USER_AGENT: &str = concat!("VendorRisk/", env!("CARGO_PKG_VERSION"));

/// A model that turns a conversation into a single assistant reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// OpenAiChat
// ---------------------------------------------------------------------------

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    model: String,
    api_key_env: String,
    api_key: Option<String>,
}

impl OpenAiChat {
    /// Build from config. A missing API key surfaces on the first call, not here.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = vendorrisk_shared::resolve_api_key(&config.api_key_env).ok();
        Self::build(config, api_key)
    }

    pub fn with_api_key(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        Self::build(config, Some(api_key.into()))
    }

    fn build(config: &LlmConfig, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    #[instrument(skip_all, fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let api_key = require_key(self.api_key.as_deref(), &self.api_key_env)?;

        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VendorRiskError::Llm(format!("request to {} failed: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "chat completion failed");
            return Err(VendorRiskError::Llm(format!("HTTP {status}: {text}")));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| VendorRiskError::Llm(format!("malformed completion response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| VendorRiskError::Llm("completion contained no message".into()))?;

        debug!(chars = content.len(), "chat completion received");
        Ok(content.trim().to_string())
    }
}

/// Build a reqwest client with the shared User-Agent and a fixed timeout.
pub(crate) fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| VendorRiskError::Network(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn require_key<'a>(key: Option<&'a str>, env_name: &str) -> Result<&'a str> {
    key.ok_or_else(|| {
        VendorRiskError::config(format!(
            "API key not found. Set the {env_name} environment variable."
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> LlmConfig {
        LlmConfig {
            base_url: format!("{}/v1/", server.uri()),
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn completion_returns_trimmed_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4o-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "  risk \n"}}]
            })))
            .mount(&server)
            .await;

        let chat = OpenAiChat::with_api_key(&config_for(&server), "sk-test").unwrap();
        let reply = chat
            .complete(&[ChatMessage::user("analyze tesla")], 0.0)
            .await
            .unwrap();
        assert_eq!(reply, "risk");
    }

    #[tokio::test]
    async fn api_error_maps_to_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let chat = OpenAiChat::with_api_key(&config_for(&server), "sk-test").unwrap();
        let err = chat.complete(&[ChatMessage::user("hi")], 0.0).await.unwrap_err();
        assert!(matches!(err, VendorRiskError::Llm(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_maps_to_llm_error() {
        let server = MockServer::start().await;
        let config = config_for(&server);
        drop(server);

        let chat = OpenAiChat::with_api_key(&config, "sk-test").unwrap();
        let err = chat.complete(&[ChatMessage::user("hi")], 0.0).await.unwrap_err();
        assert!(matches!(err, VendorRiskError::Llm(_)), "got {err:?}");
        assert!(err.to_string().contains("chat/completions"));
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let chat = OpenAiChat::with_api_key(&config_for(&server), "sk-test").unwrap();
        assert!(chat.complete(&[ChatMessage::user("hi")], 0.0).await.is_err());
    }
}
