//! OpenAI-compatible chat-completions gateway.
//!
//! [`OpenAiGateway`] sends each prompt as a single user message to
//! `{base_url}/chat/completions` and returns the first choice's text. Any
//! OpenAI-compatible endpoint works (OpenAI, Azure deployments behind a
//! compatible proxy, Ollama, vLLM).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reword_kernel::{
    CompletionGateway, GenerationError, GenerationParams, GenerationResult, Role, RoleModels,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Connection and generation settings for [`OpenAiGateway`].
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Base URL including the API version segment, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub models: RoleModels,
    pub params: GenerationParams,
    /// Per-call timeout covering connect, upload and body download.
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            models: RoleModels::default(),
            params: GenerationParams::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_models(mut self, models: RoleModels) -> Self {
        self.models = models;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .field("params", &self.params)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Gateway speaking the OpenAI chat-completions protocol over reqwest.
pub struct OpenAiGateway {
    config: OpenAiConfig,
    completions_url: String,
    http: Client,
}

impl OpenAiGateway {
    pub fn new(config: OpenAiConfig) -> GenerationResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::Configuration("API key is empty".into()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GenerationError::Configuration(e.to_string()))?;
        let completions_url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        Ok(Self {
            config,
            completions_url,
            http,
        })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.config.timeout)
        } else if err.is_decode() {
            GenerationError::Malformed(err.to_string())
        } else {
            GenerationError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, prompt, cancel), fields(model = %self.config.models.model_for(role)))]
    async fn complete(
        &self,
        role: Role,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> GenerationResult<String> {
        let body = ChatCompletionBody {
            model: self.config.models.model_for(role),
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.params.max_tokens,
            temperature: self.config.params.temperature,
        };
        debug!(url = %self.completions_url, prompt_len = prompt.len(), "sending completion request");

        let send = self
            .http
            .post(&self.completions_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            result = send => result.map_err(|e| self.transport_error(e))?,
        };

        let status = response.status();
        if !status.is_success() {
            let text = tokio::select! {
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                result = response.text() => result.unwrap_or_default(),
            };
            let message = upstream_error_message(&text).unwrap_or(text);
            warn!(status = status.as_u16(), %message, "completion rejected by upstream");
            return Err(GenerationError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatCompletionResponse = tokio::select! {
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            result = response.json() => result.map_err(|e| self.transport_error(e))?,
        };

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyCompletion)
    }
}

/// Extract `error.message` from an OpenAI-style error body.
fn upstream_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_is_extracted() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(
            upstream_error_message(body).as_deref(),
            Some("Incorrect API key provided")
        );
        assert_eq!(upstream_error_message("<html>bad gateway</html>"), None);
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            OpenAiGateway::new(OpenAiConfig::new(" ")),
            Err(GenerationError::Configuration(_))
        ));
    }

    #[test]
    fn debug_redacts_api_key() {
        let rendered = format!("{:?}", OpenAiConfig::new("sk-secret"));
        assert!(!rendered.contains("sk-secret"));
    }

    #[test]
    fn completions_url_tolerates_trailing_slash() {
        let gateway =
            OpenAiGateway::new(OpenAiConfig::new("sk").with_base_url("http://localhost:11434/v1/"))
                .unwrap();
        assert_eq!(gateway.completions_url, "http://localhost:11434/v1/chat/completions");
    }
}
