//! Gemini `generateContent` client.

use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{AnalysisError, EtymologyProvider, EtymologyRecord};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// Instruction sent with every word.
fn prompt(word: &str) -> String {
    format!(
        "Analyze the etymology of the English word \"{word}\". \
         Reply with a single JSON object and nothing else, using the keys \
         \"prefix\", \"root\", \"suffix\", \"desc\" and \"translation\". \
         Write each part with a trailing or leading hyphen where it attaches \
         and its meaning in parentheses, for example \"un- (not)\", or \"none\" \
         when the word has no such part. \"desc\" explains in one or two \
         sentences how the parts combine into the modern meaning. \
         \"translation\" is a short gloss of the word."
    )
}

/// Removes every Markdown code fence marker and surrounding whitespace.
#[must_use]
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Turns a raw `generateContent` reply into a record.
///
/// Checked in order: an `error` payload, a non-success status, a missing
/// candidate text, then the JSON inside the (fence-stripped) text.
pub fn parse_response(status: u16, body: &str) -> Result<EtymologyRecord, AnalysisError> {
    let parsed: Option<GenerateContentResponse> = serde_json::from_str(body).ok();

    if let Some(error) = parsed.as_ref().and_then(|r| r.error.as_ref()) {
        return Err(AnalysisError::Provider {
            message: error.message.clone(),
        });
    }

    if !(200..300).contains(&status) {
        return Err(AnalysisError::Http {
            status,
            body: body.to_string(),
        });
    }

    let text = parsed
        .as_ref()
        .and_then(|r| r.candidates.first())
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.first())
        .and_then(|p| p.text.as_deref())
        .ok_or(AnalysisError::EmptyResponse)?;

    let record = serde_json::from_str(&strip_code_fences(text))?;
    Ok(record)
}

/// Fetches records from the Gemini REST API.
pub struct GeminiProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, AnalysisError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AnalysisError::MissingApiKey);
        }
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AnalysisError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

impl EtymologyProvider for GeminiProvider {
    fn fetch(&self, word: &str) -> Result<EtymologyRecord, AnalysisError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt(word)),
                }],
            }],
        };

        debug!("Gemini generate_content: model={}, word={word}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        parse_response(status, &body).inspect_err(|e| warn!("Gemini lookup for '{word}' failed: {e}"))
    }
}
