//! Gemini inference client
//!
//! One synchronous call per task, with bounded connect and read timeouts.
//! The contract with the pipeline is that `generate` always returns a
//! string: transport failures, non-2xx statuses and malformed response
//! bodies are folded into an in-band diagnostic so the resulting
//! `TaskResult` is always well-formed.

use async_trait::async_trait;
use flywheel_core::config::InferenceConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Prefix of every in-band inference diagnostic (fleet-wide contract)
pub const ERROR_PREFIX: &str = "Error al consultar Gemini";

/// Seam for the inference call so the pipeline can be tested with a stub
#[async_trait]
pub trait Inference: Send + Sync {
    /// Run one query; never fails past this point
    async fn generate(&self, query: &str, api_key: &str) -> String;
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// HTTP client for the Gemini generateContent endpoint
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Build the client from configuration
    pub fn new(config: &InferenceConfig) -> flywheel_core::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.read_timeout())
            .build()
            .map_err(|e| {
                flywheel_core::Error::Startup(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn url(&self, api_key: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, api_key
        )
    }
}

fn diagnostic(detail: impl std::fmt::Display) -> String {
    format!("{}: {}", ERROR_PREFIX, detail)
}

/// Map a raw HTTP outcome onto the response-string contract
fn response_text(status: u16, body: &str) -> String {
    if !(200..300).contains(&status) {
        return diagnostic(status);
    }
    match extract_text(body) {
        Ok(text) => text,
        Err(detail) => diagnostic(detail),
    }
}

/// Pull the first candidate's first text part out of the response body
fn extract_text(body: &str) -> Result<String, String> {
    let response: GenerateResponse = serde_json::from_str(body).map_err(|e| e.to_string())?;
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or_else(|| "response contained no candidates".to_string())
}

#[async_trait]
impl Inference for GeminiClient {
    async fn generate(&self, query: &str, api_key: &str) -> String {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: query.to_string(),
                }],
            }],
        };

        let response = match self
            .http
            .post(self.url(api_key))
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return diagnostic(e),
        };

        let status = response.status().as_u16();
        debug!("Gemini responded with status {}", status);

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return diagnostic(e),
        };

        response_text(status, &body)
    }
}
