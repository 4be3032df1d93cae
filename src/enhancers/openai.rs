//! OpenAI-style chat completion models.
//!
//! OpenAI and DeepSeek share the same wire format (`/chat/completions`,
//! bearer auth, `choices[0].message.content`), so one client serves both.
//! Their failure modes differ: OpenAI reports an empty account as a 429 with
//! `insufficient_quota`, DeepSeek as a 402. Both end up as
//! [`RemoteError::QuotaExhausted`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::LanguageModel;
use super::prompt::SYSTEM_MESSAGE;
use crate::http::{build_client, error_for_response};
use crate::retry::RemoteError;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Chat completion API client.
pub struct ChatCompletionModel {
    provider: String,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl ChatCompletionModel {
    pub fn new(
        provider: &str,
        api_key: &str,
        model: &str,
        base_url: &str,
        temperature: f32,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            provider: provider.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature,
            max_tokens,
            client: build_client(timeout),
        }
    }

    fn request_body(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_MESSAGE.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[async_trait]
impl LanguageModel for ChatCompletionModel {
    async fn complete(&self, prompt: &str) -> Result<String, RemoteError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_response(response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                RemoteError::Parse(format!("{} returned no completion", self.provider))
            })
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let model = ChatCompletionModel::new(
            "DeepSeek",
            "key",
            "deepseek-chat",
            DEEPSEEK_BASE_URL,
            0.3,
            600,
            Duration::from_secs(30),
        );
        let body = serde_json::to_value(model.request_body("describe")).unwrap();

        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_MESSAGE);
        assert_eq!(body["messages"][1]["content"], "describe");
        assert_eq!(body["max_tokens"], 600);
        assert_eq!(model.provider_name(), "DeepSeek");
        assert_eq!(model.model_name(), "deepseek-chat");
    }

    #[test]
    fn test_response_parsing() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"id": "x", "choices": [{"index": 0, "message": {"role": "assistant", "content": "{}"}, "finish_reason": "stop"}]}"#,
        )
        .unwrap();
        assert_eq!(body.choices[0].message.content, "{}");
    }
}
