use std::time::Duration;

use async_trait::async_trait;
use azimuth_core::config::LlmConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("inference endpoint unavailable: {0}")]
    Unavailable(String),
    #[error("inference returned an empty completion")]
    EmptyCompletion,
}

/// A chat-completion capability. The model is strictly a translator here:
/// it phrases clarification questions and summaries, it never decides
/// requirement values, prices, or termination.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

/// Azure OpenAI chat-completions client
/// (`{endpoint}/openai/deployments/{model}/chat/completions`).
pub struct AzureOpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
    api_version: String,
    timeout: Duration,
}

impl AzureOpenAiClient {
    /// Builds a client when inference is enabled and credentialed;
    /// `None` means the caller should fall back to deterministic
    /// templates.
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let endpoint = config.endpoint.clone()?;
        let api_key = config.api_key.clone()?;

        Some(Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            api_version: config.api_version.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/openai/deployments/{}/chat/completions", self.endpoint, self.model)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for AzureOpenAiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
            temperature: 0.2,
        };

        let response = self
            .http
            .post(self.completions_url())
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", self.api_key.expose_secret())
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    LlmError::Unavailable(format!("request timed out: {error}"))
                } else {
                    LlmError::Unavailable(format!("request failed: {error}"))
                }
            })?
            .error_for_status()
            .map_err(|error| LlmError::Unavailable(format!("unexpected status: {error}")))?;

        let decoded = response.json::<ChatResponse>().await.map_err(|error| {
            LlmError::Unavailable(format!("unexpected response shape: {error}"))
        })?;

        let content = decoded
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty());

        content.ok_or(LlmError::EmptyCompletion)
    }
}
