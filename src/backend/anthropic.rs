//! Anthropic messages API adapter

use super::openai::ChatMessage;
use super::{clean_message, join_url, ApiKey, HttpTransport, Provider};
use crate::constants::{
    ANTHROPIC_DEFAULT_BASE_URL, ANTHROPIC_DEFAULT_MODEL, ANTHROPIC_MAX_TOKENS, ANTHROPIC_VERSION,
};
use crate::error::GenerateError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: String,
}

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    transport: HttpTransport,
    api_key: ApiKey,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(
        transport: HttpTransport,
        api_key: ApiKey,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            transport,
            api_key,
            base_url: base_url.unwrap_or_else(|| ANTHROPIC_DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| ANTHROPIC_DEFAULT_MODEL.to_string()),
        }
    }

    fn endpoint(&self) -> String {
        join_url(&self.base_url, "messages")
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("x-api-key", self.api_key.expose().to_string()),
            ("anthropic-version", ANTHROPIC_VERSION.to_string()),
        ]
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: ANTHROPIC_MAX_TOKENS,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let response: MessagesResponse = self
            .transport
            .post_json(&self.endpoint(), &self.headers(), &request)
            .await?;
        extract_message(response)
    }
}

fn extract_message(response: MessagesResponse) -> Result<String, GenerateError> {
    // Text blocks only; tool-use or thinking blocks carry no message
    let text = response
        .content
        .into_iter()
        .find(|block| block.kind.is_empty() || block.kind == "text")
        .map(|block| block.text)
        .ok_or(GenerateError::Empty(Provider::Anthropic))?;
    clean_message(&text, Provider::Anthropic)
}
