//! Extraction service HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). Speaks the
//! `generateContent` wire format: a system instruction plus one user turn
//! made of text and inline file parts. Returns the first candidate's text.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Extraction service client (blocking).
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    token: String,
    timeout: Duration,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// One part of a user turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    /// Base64, no data-URL prefix.
    pub data: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline(mime_type: &str, data: String) -> Self {
        Part::Inline {
            inline_data: InlineData {
                mime_type: mime_type.to_string(),
                data,
            },
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    system_instruction: Instruction<'a>,
    contents: [Turn<'a>; 1],
}

#[derive(Serialize)]
struct Instruction<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    parts: &'a [Part],
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
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl LlmClient {
    pub fn new(
        endpoint: &str,
        model: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, ExtractError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("tila/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ExtractError::Network(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            token: token.to_string(),
            timeout,
        })
    }

    pub fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Send one request and return the first candidate's text.
    ///
    /// An answer with no candidates yields an empty string, which the payload
    /// parser then rejects.
    pub fn generate(&self, instruction: &str, parts: &[Part]) -> Result<String, ExtractError> {
        let body = GenerateRequest {
            system_instruction: Instruction {
                parts: [TextPart { text: instruction }],
            },
            contents: [Turn { role: "user", parts }],
        };

        log::debug!("POST {} ({} parts)", self.url(), parts.len());
        let response = self
            .http
            .post(self.url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(|e| self.send_error(e))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractError::Http(status, error_message(&body)));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ExtractError::InvalidJson(e.to_string()))?;

        Ok(parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default())
    }

    fn send_error(&self, e: reqwest::Error) -> ExtractError {
        if e.is_timeout() {
            ExtractError::Timeout(self.timeout)
        } else {
            ExtractError::Network(e.to_string())
        }
    }
}

/// Service error text: `error.message` when the body carries one.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}
