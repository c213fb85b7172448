//! Generation provider boundary.
//!
//! Mirrors the embedding boundary: [`GenerationProvider`] is the seam the
//! composer sends chat messages through, with [`OpenAiChat`] as the
//! production implementation against `POST /v1/chat/completions`.
//! Retry/backoff policy is identical to [`crate::embedding`] and stays
//! inside the provider.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::RagError;

/// Message role for chat-style generation models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Boundary interface for text generation models.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, RagError>;
}

/// Generation provider backed by the OpenAI chat completions API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiChat {
    model: String,
    max_retries: u32,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(config: &GenerationConfig) -> Result<Self, RagError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| RagError::Generation("OPENAI_API_KEY not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Generation(e.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            max_retries: config.max_retries,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, RagError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| RagError::Generation(e.to_string()))?;
                        return parse_chat_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(RagError::Generation(format!(
                            "OpenAI API error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    return Err(RagError::Generation(format!(
                        "OpenAI API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(RagError::Generation(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| RagError::Generation("generation failed after retries".to_string())))
    }
}

/// Extract `choices[0].message.content`; a missing content field is an
/// empty answer, not an error (matches the API contract for stop reasons).
fn parse_chat_response(json: &serde_json::Value) -> Result<String, RagError> {
    let choices = json
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| RagError::Generation("invalid response: missing choices".to_string()))?;

    let first = choices
        .first()
        .ok_or_else(|| RagError::Generation("invalid response: empty choices".to_string()))?;

    Ok(first
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_serialize_lowercase() {
        let msg = ChatMessage::system("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        let msg = ChatMessage::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_parse_chat_response() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Paris."}}]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "Paris.");
    }

    #[test]
    fn test_parse_chat_response_null_content() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "");
    }

    #[test]
    fn test_parse_chat_response_no_choices() {
        let json = serde_json::json!({"choices": []});
        assert!(matches!(
            parse_chat_response(&json),
            Err(RagError::Generation(_))
        ));
    }
}
