use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RefinerConfig;

use super::{BioRefiner, GenerationError, build_prompt};

/// Calls the Gemini `generateContent` REST endpoint.
#[derive(Clone)]
pub struct GeminiRefiner {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiRefiner {
    pub fn new(config: &RefinerConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build refiner HTTP client")?;
        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send_request(
        &self,
        api_key: &str,
        body: &GenerateContentRequest,
    ) -> Result<String, GenerationError> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            self.base_url,
            model = self.model,
        );

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| GenerationError::Request(err.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::Request(format!("Failed to parse Gemini response: {err}")))?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl BioRefiner for GeminiRefiner {
    async fn refine(&self, traits: &str) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::NotConfigured)?;
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: build_prompt(traits),
                }],
            }],
        };
        debug!("Requesting bio from Gemini model {}", self.model);
        self.send_request(api_key, &request).await
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, GenerationError> {
    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
        .filter(|text| !text.trim().is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

fn map_http_error(status: StatusCode, body: String) -> GenerationError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    GenerationError::Upstream {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).expect("valid response json")
    }

    #[test]
    fn extracts_first_text_part() {
        let parsed = response(
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{}},{"text":"Quiet builder."}]}}]}"#,
        );
        assert_eq!(extract_text_response(parsed).unwrap(), "Quiet builder.");
    }

    #[test]
    fn missing_or_blank_text_is_empty_response() {
        assert_eq!(
            extract_text_response(response(r#"{"candidates":[]}"#)).unwrap_err(),
            GenerationError::EmptyResponse
        );
        assert_eq!(
            extract_text_response(response(r#"{}"#)).unwrap_err(),
            GenerationError::EmptyResponse
        );
        assert_eq!(
            extract_text_response(response(
                r#"{"candidates":[{"content":{"parts":[{"text":"   "}]}}]}"#
            ))
            .unwrap_err(),
            GenerationError::EmptyResponse
        );
    }

    #[test]
    fn http_error_body_is_unwrapped() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"code":429,"message":"quota exhausted","status":"RESOURCE_EXHAUSTED"}}"#
                .to_string(),
        );
        assert_eq!(
            err,
            GenerationError::Upstream {
                status: 429,
                message: "RESOURCE_EXHAUSTED: quota exhausted".to_string()
            }
        );

        let raw = map_http_error(StatusCode::BAD_GATEWAY, "upstream down".to_string());
        assert!(matches!(raw, GenerationError::Upstream { status: 502, ref message } if message == "upstream down"));
    }

    #[tokio::test]
    async fn unconfigured_refiner_fails_without_network() {
        let refiner = GeminiRefiner::new(&RefinerConfig::default()).unwrap();
        assert!(!refiner.is_configured());
        assert_eq!(
            refiner.refine("curious").await.unwrap_err(),
            GenerationError::NotConfigured
        );
    }
}
