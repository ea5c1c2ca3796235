use crate::traits::LlmGateway;
use crate::GatewayError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn from_env() -> Result<Self, GatewayError> {
        let api_key = non_empty_env("GEMINI_API_KEY")
            .ok_or_else(|| GatewayError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;

        let mut config = Self::new(api_key);
        if let Some(model) = non_empty_env("GEMINI_MODEL") {
            config.model = model;
        }
        if let Some(endpoint) = non_empty_env("GEMINI_ENDPOINT") {
            config.endpoint = endpoint;
        }
        Ok(config)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let value = value.trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
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

pub struct GeminiGateway {
    endpoint: String,
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiGateway {
    pub fn new(config: GeminiConfig) -> Result<Self, GatewayError> {
        if config.api_key.trim().is_empty() {
            return Err(GatewayError::NotConfigured("gemini api key is empty".to_string()));
        }

        Url::parse(&config.endpoint)?;
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            model: config.model,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> Result<Url, GatewayError> {
        Ok(Url::parse(&format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        ))?)
    }
}

fn build_request(context: &str, instruction: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: vec![RequestPart {
                text: format!("{instruction}\n\nText to analyze:\n{context}"),
            }],
        }],
    }
}

fn response_text(response: GenerateContentResponse) -> Result<String, GatewayError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GatewayError::MalformedResponse(
            "gemini response had no candidate text".to_string(),
        ));
    }

    Ok(text)
}

#[async_trait]
impl LlmGateway for GeminiGateway {
    async fn classify(&self, context: &str, instruction: &str) -> Result<String, GatewayError> {
        let url = self.generate_url()?;
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(context, instruction))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                backend: "gemini".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateContentResponse = response.json().await?;
        let text = response_text(payload)?;
        debug!(model = %self.model, answer = %text.trim(), "gemini answered");
        Ok(text)
    }
}
