use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::composer::GenerateRequest;
use crate::error::{ChatError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Shown as the assistant reply when the response carries no text.
pub const NO_VALID_RESPONSE: &str = "⚠️ No valid response.";

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// `endpoint` is either the Google API root or a relay that adds the key
    /// itself, in which case `api_key` may be `None`.
    pub fn new(endpoint: &str, model: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Send the full turn history and return one completion text.
    pub async fn query(&self, request: &GenerateRequest) -> Result<String> {
        if self.api_key.is_none() && self.endpoint == DEFAULT_ENDPOINT {
            return Err(ChatError::MissingApiKey);
        }

        debug!(turns = request.contents.len(), model = %self.model, "sending generateContent request");

        let mut builder = self
            .client
            .post(self.url())
            .header("Content-Type", "application/json")
            .json(request);

        if let Some(key) = &self.api_key {
            builder = builder.header("x-goog-api-key", key);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        interpret_response(status, &body)
    }
}

/// Turn a raw HTTP status and body into completion text or an error.
///
/// A success body without `candidates[0].content.parts[0].text` (or with an
/// empty text) is not an error: it yields [`NO_VALID_RESPONSE`].
pub fn interpret_response(status: u16, body: &str) -> Result<String> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("Status {}", status));
        return Err(ChatError::Api { status, message });
    }

    let value: Value = serde_json::from_str(body)?;
    let text = value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .unwrap_or(NO_VALID_RESPONSE);

    Ok(text.to_string())
}
