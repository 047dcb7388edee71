//! Google Gemini `generateContent` adapter

use super::{clean_message, join_url, ApiKey, HttpTransport, Provider};
use crate::constants::{GEMINI_DEFAULT_BASE_URL, GEMINI_DEFAULT_MODEL};
use crate::error::GenerateError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidatePart {
    text: String,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    transport: HttpTransport,
    api_key: ApiKey,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(
        transport: HttpTransport,
        api_key: ApiKey,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            transport,
            api_key,
            base_url: base_url.unwrap_or_else(|| GEMINI_DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string()),
        }
    }

    fn endpoint(&self) -> String {
        join_url(
            &self.base_url,
            &format!("models/{}:generateContent", self.model),
        )
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![("x-goog-api-key", self.api_key.expose().to_string())]
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        let request = build_request(prompt);
        let response: GenerateResponse = self
            .transport
            .post_json(&self.endpoint(), &self.headers(), &request)
            .await?;
        extract_message(response)
    }
}

fn build_request(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part { text: prompt }],
        }],
    }
}

fn extract_message(response: GenerateResponse) -> Result<String, GenerateError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or(GenerateError::Empty(Provider::Gemini))?;
    clean_message(&text, Provider::Gemini)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(base_url: Option<&str>) -> GeminiClient {
        GeminiClient::new(
            HttpTransport::new().unwrap(),
            ApiKey::new("AIzaSyA-0123456789abcdefghij"),
            base_url.map(str::to_string),
            None,
        )
    }

    #[test]
    fn test_endpoint_uses_default_model() {
        assert_eq!(
            client(None).endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn test_key_sent_as_header_not_query() {
        let client = client(Some("http://localhost:9000/"));
        assert!(!client.endpoint().contains("key="));
        assert_eq!(client.headers()[0].0, "x-goog-api-key");
        assert!(client.endpoint().starts_with("http://localhost:9000/models/"));
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(build_request("diff here")).unwrap();
        assert_eq!(body, json!({"contents": [{"parts": [{"text": "diff here"}]}]}));
    }

    #[test]
    fn test_first_candidate_part_is_message() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "'docs: update readme'"}, {"text": "ignored"}]}},
                {"content": {"parts": [{"text": "second candidate"}]}}
            ]
        }))
        .unwrap();

        assert_eq!(extract_message(response).unwrap(), "docs: update readme");
    }

    #[test]
    fn test_no_candidates_is_empty_error() {
        let response: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            extract_message(response),
            Err(GenerateError::Empty(Provider::Gemini))
        ));
    }
}
