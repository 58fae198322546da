use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CompletionError;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role("assistant", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }

    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Anything that turns a conversation into completion text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError>;
}

/// Connection and sampling parameters for an OpenAI-compatible endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub api_base: String,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 1024,
            temperature: 0.5,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    n: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiClient {
    config: CompletionConfig,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: CompletionConfig, retry: RetryPolicy) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            config,
            retry,
            client,
        })
    }

    async fn request_once(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        let request = build_request(&self.config, messages);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, body));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Decode(e.to_string()))?;

        first_choice_text(chat_response)
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    /// Rate-limited requests are retried once after the configured backoff.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        self.retry
            .retry(
                "chat_completion",
                CompletionError::is_rate_limited,
                || self.request_once(messages),
            )
            .await
    }
}

fn build_request<'a>(config: &'a CompletionConfig, messages: &'a [ChatMessage]) -> ChatRequest<'a> {
    ChatRequest {
        model: &config.model,
        messages,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        n: 1,
    }
}

/// Map a non-success HTTP status onto the error kinds callers retry on.
fn classify_failure(status: StatusCode, body: String) -> CompletionError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited(body),
        StatusCode::BAD_REQUEST
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNPROCESSABLE_ENTITY => CompletionError::InvalidRequest(body),
        _ => CompletionError::Api {
            status: status.as_u16(),
            message: body,
        },
    }
}

fn first_choice_text(response: ChatResponse) -> Result<String, CompletionError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(CompletionError::EmptyCompletion)?;

    Ok(choice.message.content.unwrap_or_default().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let config = CompletionConfig::default();
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("患者发热")];
        let value = serde_json::to_value(build_request(&config, &messages)).unwrap();

        assert_eq!(value["model"], "gpt-3.5-turbo");
        assert_eq!(value["max_tokens"], 1024);
        assert_eq!(value["n"], 1);
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "患者发热");
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_failure(StatusCode::TOO_MANY_REQUESTS, String::new()).is_rate_limited());
        assert!(classify_failure(StatusCode::BAD_REQUEST, String::new()).is_invalid_request());
        assert!(matches!(
            classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "down".to_string()),
            CompletionError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_first_choice_is_trimmed() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  |a|b|c|d|\n "}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice_text(response).unwrap(), "|a|b|c|d|");
    }

    #[test]
    fn test_no_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            first_choice_text(response),
            Err(CompletionError::EmptyCompletion)
        ));
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = CompletionConfig {
            api_key: "sk-secret".to_string(),
            ..CompletionConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
