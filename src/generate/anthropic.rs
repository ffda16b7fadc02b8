use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Generator, build_http_client, map_http_error, map_status_error};
use crate::errors::{GenerationError, PipelineError};

pub(super) const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Anthropic Messages API backend.
pub struct AnthropicGenerator {
    client: reqwest::Client,
    model: String,
    api_key: String,
    max_tokens: u32,
}

impl AnthropicGenerator {
    pub fn new(model: String, api_key: String, max_tokens: u32) -> Result<Self, PipelineError> {
        Ok(Self {
            client: build_http_client()?,
            model,
            api_key,
            max_tokens,
        })
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![ApiMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_status_error(status.as_u16(), body));
        }

        let body: MessagesResponse = response.json().await.map_err(map_http_error)?;
        body.content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or_else(|| GenerationError::BadResponse("No text content in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_user_message() {
        let request = MessagesRequest {
            model: "claude-sonnet-4-20250514",
            max_tokens: 4096,
            messages: vec![ApiMessage {
                role: "user",
                content: "Design it",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 4096);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Design it");
    }

    #[test]
    fn test_response_skips_non_text_blocks() {
        let body = r#"{"content":[{"type":"thinking","thinking":"hmm"},{"type":"text","text":"Architecture"}]}"#;
        let parsed: MessagesResponse = serde_json::from_str(body).unwrap();
        let text = parsed.content.into_iter().find_map(|b| match b {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        });
        assert_eq!(text.as_deref(), Some("Architecture"));
    }
}
