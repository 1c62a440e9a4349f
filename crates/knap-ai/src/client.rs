//! Client for the generative scoring/extraction service.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        AiError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for AiError {
    fn from(e: serde_json::Error) -> Self {
        AiError::Parse(e.to_string())
    }
}

/// Single request/response seam to the model. No streaming, no schema
/// enforcement — callers own all validation of the returned text.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl AiConfig {
    pub fn from_env() -> Result<Self, AiError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| AiError::Config("GEMINI_API_KEY not set".into()))?;
        Ok(Self {
            api_key,
            model: std::env::var("KNAP_AI_MODEL")
                .unwrap_or_else(|_| "gemini-3-flash-preview".to_string()),
            endpoint: std::env::var("KNAP_AI_ENDPOINT")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            timeout: Duration::from_secs(60),
        })
    }
}

/// Gemini `generateContent` REST client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    config: AiConfig,
}

impl GeminiClient {
    pub fn new(config: AiConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AiError::Config(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, AiError> {
        Self::new(AiConfig::from_env()?)
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint, self.config.model
        );
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        debug!(model = %self.config.model, prompt_chars = prompt.chars().count(), "generate");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AiError::Api(format!("status {status}: {detail}")));
        }

        let value: serde_json::Value = response.json().await?;
        value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| AiError::Parse("response carries no candidate text".into()))
    }
}

/// Truncate to at most `budget` characters, never splitting a code point.
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let korean = "공지사항 본문";
        assert_eq!(truncate_chars(korean, 4), "공지사항");
        assert_eq!(truncate_chars(korean, 100), korean);
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }
}
