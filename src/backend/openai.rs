//! OpenAI-compatible chat completions adapter
//!
//! Serves both OpenAI and OpenRouter; the two differ only in their default
//! endpoint, default model, and the attribution headers OpenRouter expects.

use super::{clean_message, join_url, ApiKey, HttpTransport, Provider};
use crate::constants::{
    OPENAI_DEFAULT_BASE_URL, OPENAI_DEFAULT_MODEL, OPENROUTER_DEFAULT_BASE_URL,
    OPENROUTER_DEFAULT_MODEL, OPENROUTER_REFERER, OPENROUTER_TITLE,
};
use crate::error::GenerateError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    transport: HttpTransport,
    provider: Provider,
    api_key: ApiKey,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        transport: HttpTransport,
        provider: Provider,
        api_key: ApiKey,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Self {
        let (default_url, default_model) = match provider {
            Provider::OpenRouter => (OPENROUTER_DEFAULT_BASE_URL, OPENROUTER_DEFAULT_MODEL),
            _ => (OPENAI_DEFAULT_BASE_URL, OPENAI_DEFAULT_MODEL),
        };
        Self {
            transport,
            provider,
            api_key,
            base_url: base_url.unwrap_or_else(|| default_url.to_string()),
            model: model.unwrap_or_else(|| default_model.to_string()),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    fn endpoint(&self) -> String {
        join_url(&self.base_url, "chat/completions")
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![(
            "Authorization",
            format!("Bearer {}", self.api_key.expose()),
        )];
        if self.provider == Provider::OpenRouter {
            headers.push(("HTTP-Referer", OPENROUTER_REFERER.to_string()));
            headers.push(("X-Title", OPENROUTER_TITLE.to_string()));
        }
        headers
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let response: ChatResponse = self
            .transport
            .post_json(&self.endpoint(), &self.headers(), &request)
            .await?;
        extract_message(response, self.provider)
    }
}

fn extract_message(response: ChatResponse, provider: Provider) -> Result<String, GenerateError> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(GenerateError::Empty(provider))?;
    clean_message(&text, provider)
}
