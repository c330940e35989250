use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::advisory::AdvisoryModel;
use crate::advisory::errors::AdvisoryError;

/// Client for the `generateContent` endpoint of the generative-language API.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(url: String, model: String, api_key: Option<String>) -> Result<Self, AdvisoryError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            url: url.trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
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
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        (!text.trim().is_empty()).then_some(text)
    }
}

#[async_trait]
impl AdvisoryModel for GeminiClient {
    #[instrument(skip(self, prompt), fields(model = %self.model), level = "debug")]
    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryError> {
        let key = self.api_key.as_deref().ok_or(AdvisoryError::MissingApiKey)?;
        let url = format!("{}/v1beta/models/{}:generateContent", self.url, self.model);

        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(&url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify_failure(status, text));
        }

        let parsed: GenerateResponse = resp.json().await?;
        debug!(candidates = parsed.candidates.len(), "advisory response received");

        parsed.into_text().ok_or(AdvisoryError::EmptyResponse)
    }
}

fn classify_failure(status: StatusCode, body: String) -> AdvisoryError {
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        AdvisoryError::RateLimited(body)
    } else {
        AdvisoryError::Api {
            status: status.as_u16(),
            body,
        }
    }
}
