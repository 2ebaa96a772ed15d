use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::backend::CompletionClient;
use crate::error::BackendError;

const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent";

/// Upper bound on one completion round trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const AUTOCOMPLETE_INSTRUCTION: &str = "You are an autocomplete assistant. Only return 2-5 words to continue the user's sentence. If the user's sentence does not end with a space or punctuation, start your completion with a space to ensure proper word separation.";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<PartOut<'a>>,
}

#[derive(Debug, Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    #[serde(rename = "thinkingConfig")]
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
struct ThinkingConfig {
    #[serde(rename = "thinkingBudget")]
    thinking_budget: i32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Debug, Deserialize)]
struct PartIn {
    text: Option<String>,
}

/// Inline-suggestion client for the Gemini `generateContent` API.
pub struct GeminiClient {
    api_key: String,
    http: reqwest::Client,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            api_key: api_key.into(),
            http,
            endpoint: ENDPOINT.to_string(),
        })
    }

    /// Read the key from `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?;
        Self::new(key)
    }

    /// Point the client at another endpoint (proxies, test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

fn build_request(prompt: &str, max_tokens: u32, temperature: f32) -> GenerateRequest<'_> {
    // Gemini has no system role; the instruction goes in as a user turn.
    GenerateRequest {
        contents: vec![
            Content {
                role: "user",
                parts: vec![PartOut {
                    text: AUTOCOMPLETE_INSTRUCTION,
                }],
            },
            Content {
                role: "user",
                parts: vec![PartOut { text: prompt }],
            },
        ],
        generation_config: GenerationConfig {
            max_output_tokens: max_tokens,
            temperature,
            thinking_config: ThinkingConfig { thinking_budget: 0 },
        },
    }
}

/// First text part of the first candidate.
fn extract_text(body: &str) -> Result<String, BackendError> {
    let response: GenerateResponse = serde_json::from_str(body)?;
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or(BackendError::EmptyCompletion)
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn request_completion(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, BackendError> {
        let body = build_request(prompt, max_tokens, temperature);
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::Transport(format!("Gemini API returned {status}: {text}")));
        }
        extract_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_instruction_prompt_and_knobs() {
        let json = serde_json::to_value(build_request("Dear team, the", 16, 0.3)).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], AUTOCOMPLETE_INSTRUCTION);
        assert_eq!(json["contents"][1]["parts"][0]["text"], "Dear team, the");
        assert_eq!(json["generation_config"]["max_output_tokens"], 16);
        assert_eq!(json["generation_config"]["thinkingConfig"]["thinkingBudget"], 0);
    }

    #[test]
    fn first_text_part_wins() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":" meeting is"},{"text":"x"}],"role":"model"},"finishReason":"STOP","index":0}]}"#;
        assert_eq!(extract_text(body).unwrap(), " meeting is");
    }

    #[test]
    fn missing_text_is_an_empty_completion() {
        for body in [
            r#"{"candidates":[]}"#,
            r#"{}"#,
            r#"{"candidates":[{"content":{"role":"model"},"finishReason":"MAX_TOKENS"}]}"#,
            r#"{"candidates":[{"finishReason":"SAFETY"}]}"#,
        ] {
            assert!(matches!(extract_text(body), Err(BackendError::EmptyCompletion)), "{body}");
        }
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(extract_text("<html>"), Err(BackendError::Json(_))));
    }
}
