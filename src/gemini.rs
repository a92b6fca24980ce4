//! Thin client for the Gemini `generateContent` endpoint.
//!
//! One POST per call, no streaming. The API key is resolved from the
//! environment at call time, so a missing key fails the first request that
//! needs it rather than process start.

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::{self, HttpTuning, USER_AGENT};
use crate::error::{RadarError, Result};

pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const FLASH_MODEL: &str = "gemini-2.5-flash";
pub const PRO_MODEL: &str = "gemini-2.5-pro";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn extract_text(resp: &GenerateResponse) -> String {
    resp.candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|c| {
            c.parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    max_attempts: u8,
}

impl GeminiClient {
    pub fn new(tuning: HttpTuning) -> Self {
        Self::with_endpoint(tuning, GEMINI_ENDPOINT)
    }

    /// Endpoint injection for tests (a local listener speaking the same
    /// wire format).
    pub fn with_endpoint(tuning: HttpTuning, endpoint: impl Into<String>) -> Self {
        Self {
            http: tuning.client(USER_AGENT),
            endpoint: endpoint.into(),
            max_attempts: tuning.max_attempts.max(1),
        }
    }

    /// One prompt-completion exchange with `model`. Errors carry the model
    /// name, the status, and the response body; a 2xx with no text is a
    /// distinct empty-content failure.
    pub async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let api_key = config::gemini_api_key()?;
        let url = format!("{}/models/{}:generateContent", self.endpoint, model);
        info!(model, prompt_chars = prompt.len(), "calling generation endpoint");

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let mut attempt: u8 = 0;
        let resp = loop {
            attempt += 1;
            let sent = self
                .http
                .post(&url)
                .header("x-goog-api-key", &api_key)
                .json(&body)
                .send()
                .await;

            match sent {
                Ok(resp) => {
                    let status = resp.status();
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if !status.is_success() && retryable && attempt < self.max_attempts {
                        tokio::time::sleep(backoff(attempt)).await;
                        continue;
                    }
                    break resp;
                }
                Err(e) => {
                    if attempt < self.max_attempts {
                        tokio::time::sleep(backoff(attempt)).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        };

        counter!("generation_calls_total", "model" => model.to_string()).increment(1);

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            error!(model, status = status.as_u16(), "generation call failed");
            return Err(RadarError::transport(model, status.as_u16(), message));
        }

        let payload: GenerateResponse = resp.json().await?;
        let text = extract_text(&payload);
        if text.is_empty() {
            error!(model, "no text content in response");
            return Err(RadarError::EmptyContent {
                model: model.to_string(),
            });
        }

        info!(model, chars = text.len(), "generation call succeeded");
        Ok(text)
    }
}

fn backoff(attempt: u8) -> std::time::Duration {
    std::time::Duration::from_millis(500u64 << (attempt - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_text_joins_parts_and_trims() {
        let resp: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"  hello "},{"text":"world  "}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(&resp), "hello world");
    }

    #[test]
    fn extract_text_handles_missing_candidates() {
        let resp: GenerateResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(extract_text(&resp), "");
    }

    #[test]
    fn extract_text_handles_null_part_text() {
        let resp: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{}]}}]}"#).unwrap();
        assert_eq!(extract_text(&resp), "");
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(1).as_millis(), 500);
        assert_eq!(backoff(2).as_millis(), 1000);
        assert_eq!(backoff(3).as_millis(), 2000);
    }
}
