//! Google Gemini text generation over the REST `generateContent` endpoint.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::GeminiSettings;
use crate::content::TextGenerator;
use crate::error::BoxError;

pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl GeminiClient {
    /// Fails when no API key is configured.
    pub fn new(http: Client, settings: &GeminiSettings) -> Result<Self, BoxError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or("GEMINI_API_KEY is not set")?;

        Ok(GeminiClient {
            http,
            api_key,
            model: settings.model.clone(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, BoxError> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);
        info!("Requesting completion from {} ({} char prompt)", self.model, prompt.chars().count());

        // Key goes in a header; request URLs end up in error text.
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        let body = response.text().await.map_err(reqwest::Error::without_url)?;
        if !status.is_success() {
            return Err(format!("Gemini API error ({}): {}", status, body).into());
        }

        let text = parse_generated_text(&body)?;
        debug!("Gemini returned {} chars", text.chars().count());
        Ok(text)
    }
}

/// Joins the text parts of the first candidate.
fn parse_generated_text(body: &str) -> Result<String, BoxError> {
    let json: Value = serde_json::from_str(body)?;
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .ok_or("No candidates in Gemini response")?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err("Gemini returned an empty response".into());
    }
    Ok(text.trim().to_string())
}
