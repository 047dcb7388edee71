//! Commit message backends
//!
//! One capability, `generate(diff) -> message`, over a closed set of provider
//! adapters. Each adapter owns its endpoint, request shape and auth headers;
//! they share the HTTP transport, prompt and response clean-up defined here.
//!
//! Credentials are shape-checked locally with [`validate_credential`] before
//! anything touches the network.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use crate::config::Configuration;
use crate::constants::{BACKEND_TIMEOUT, SYSTEM_PROMPT};
use crate::error::{GenerateError, ValidationError};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// Supported backend providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    OpenAi,
    OpenRouter,
    #[serde(alias = "claude")]
    Anthropic,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Gemini,
        Provider::OpenAi,
        Provider::OpenRouter,
        Provider::Anthropic,
    ];

    /// Identifier used in the configuration record and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
            Provider::OpenRouter => "openrouter",
            Provider::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provider::Gemini => "Gemini",
            Provider::OpenAi => "OpenAI",
            Provider::OpenRouter => "OpenRouter",
            Provider::Anthropic => "Anthropic",
        };
        f.write_str(s)
    }
}

impl FromStr for Provider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAi),
            "openrouter" => Ok(Provider::OpenRouter),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            _ => Err(ValidationError::UnknownProvider(s.to_string())),
        }
    }
}

/// Reject credentials whose shape cannot be right for `provider`
pub fn validate_credential(provider: Provider, api_key: &str) -> Result<(), ValidationError> {
    let key = api_key.trim();
    if key.is_empty() {
        return Err(ValidationError::MissingCredential);
    }

    match provider {
        Provider::Gemini if key.len() < 20 => {
            Err(ValidationError::CredentialTooShort { provider })
        }
        Provider::OpenAi | Provider::OpenRouter
            if !key.starts_with("sk-") && !key.starts_with("sk_") =>
        {
            Err(ValidationError::CredentialPrefix {
                provider,
                expected: "'sk-' or 'sk_'",
            })
        }
        Provider::Anthropic if !key.starts_with("sk-ant-") => {
            Err(ValidationError::CredentialPrefix {
                provider,
                expected: "'sk-ant-'",
            })
        }
        _ => Ok(()),
    }
}

/// Anything that can turn a diff into a commit message
pub trait MessageSource {
    fn generate(&self, diff: &str) -> impl Future<Output = Result<String, GenerateError>>;
}

/// Configured backend: one variant per provider family
#[derive(Debug, Clone)]
pub enum Backend {
    Gemini(GeminiClient),
    OpenAi(OpenAiClient),
    Anthropic(AnthropicClient),
}

impl Backend {
    /// Build the backend selected by `config`, validating its credential first
    pub fn from_config(config: &Configuration) -> Result<Self> {
        config.validate_credential()?;

        let transport = HttpTransport::new()?;
        let key = ApiKey::new(config.api_key.trim());
        let base_url = config.base_url.clone();
        let model = config.model.clone();

        let backend = match config.provider {
            Provider::Gemini => Backend::Gemini(GeminiClient::new(transport, key, base_url, model)),
            Provider::OpenAi | Provider::OpenRouter => Backend::OpenAi(OpenAiClient::new(
                transport,
                config.provider,
                key,
                base_url,
                model,
            )),
            Provider::Anthropic => {
                Backend::Anthropic(AnthropicClient::new(transport, key, base_url, model))
            }
        };
        Ok(backend)
    }

    pub fn provider(&self) -> Provider {
        match self {
            Backend::Gemini(_) => Provider::Gemini,
            Backend::OpenAi(client) => client.provider(),
            Backend::Anthropic(_) => Provider::Anthropic,
        }
    }
}

impl MessageSource for Backend {
    async fn generate(&self, diff: &str) -> Result<String, GenerateError> {
        let prompt = build_prompt(diff);
        match self {
            Backend::Gemini(client) => client.complete(&prompt).await,
            Backend::OpenAi(client) => client.complete(&prompt).await,
            Backend::Anthropic(client) => client.complete(&prompt).await,
        }
    }
}

/// Backend credential; never printed by `Debug`
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Shared HTTP client with the backend timeout applied
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(BACKEND_TIMEOUT)
            .user_agent(concat!("autogit/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// POST `body` as JSON and decode a JSON response.
    ///
    /// Non-2xx responses become [`GenerateError::Status`] with the body text.
    pub async fn post_json<B, T>(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &B,
    ) -> Result<T, GenerateError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| GenerateError::Decode(e.to_string()))
    }
}

/// Prompt sent to every provider: fixed instruction followed by the diff
pub fn build_prompt(diff: &str) -> String {
    format!("{}\n\nCode diff:\n{}", SYSTEM_PROMPT, diff)
}

/// Strip surrounding whitespace and quote characters from a raw reply
pub fn clean_message(raw: &str, provider: Provider) -> Result<String, GenerateError> {
    let message = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim();

    if message.is_empty() {
        Err(GenerateError::Empty(provider))
    } else {
        Ok(message.to_string())
    }
}

/// Join a base URL and a path without doubling slashes
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
