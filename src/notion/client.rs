//! HTTP client for the Notion REST API.

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::Value;

use super::parsing::{decide_generation, extract_tasks, page_status_from_properties};
use super::{PageAnalysis, TaskSource};
use crate::config::NotionSettings;
use crate::error::BoxError;

/// Reads pages and their block children with an integration token.
pub struct NotionClient {
    http: Client,
    api_key: String,
    api_url: String,
    version: String,
    timezone: Tz,
}

impl NotionClient {
    /// Fails when no integration token is configured.
    pub fn new(http: Client, settings: &NotionSettings, timezone: Tz) -> Result<Self, BoxError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or("NOTION_API_KEY is not set")?;

        Ok(NotionClient {
            http,
            api_key,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            version: settings.version.clone(),
            timezone,
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value, BoxError> {
        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", &self.version)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(format!("Notion API error ({}): {}", status, body).into());
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetches the page object, whose `properties` carry the status.
    pub async fn get_page(&self, page_id: &str) -> Result<Value, BoxError> {
        let url = format!("{}/pages/{}", self.api_url, urlencoding::encode(page_id));
        self.get_json(&url).await
    }

    /// Fetches every block child of a page, following pagination cursors.
    pub async fn get_blocks(&self, page_id: &str) -> Result<Vec<Value>, BoxError> {
        let base = format!(
            "{}/blocks/{}/children?page_size=100",
            self.api_url,
            urlencoding::encode(page_id)
        );
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let url = match &cursor {
                Some(c) => format!("{}&start_cursor={}", base, urlencoding::encode(c)),
                None => base.clone(),
            };
            let json = self.get_json(&url).await?;

            if let Some(results) = json.get("results").and_then(Value::as_array) {
                blocks.extend(results.iter().cloned());
            }

            let has_more = json.get("has_more").and_then(Value::as_bool).unwrap_or(false);
            cursor = json
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !has_more || cursor.is_none() {
                break;
            }
        }

        debug!("Fetched {} blocks for page {}", blocks.len(), page_id);
        Ok(blocks)
    }

    fn today(&self) -> String {
        Utc::now()
            .with_timezone(&self.timezone)
            .format("%Y-%m-%d")
            .to_string()
    }
}

#[async_trait]
impl TaskSource for NotionClient {
    async fn analyze_page(&self, page_id: &str) -> Result<PageAnalysis, BoxError> {
        let page_id = page_id.trim();
        if page_id.is_empty() {
            return Err("Page ID is required".into());
        }
        info!("Analyzing Notion page {}", page_id);

        let page = self.get_page(page_id).await?;
        let status = page_status_from_properties(page.get("properties").unwrap_or(&Value::Null));

        let blocks = self.get_blocks(page_id).await?;
        let (completed_tasks, incomplete_tasks) = extract_tasks(&blocks, &self.today());

        let (should_generate_tweet, reason) =
            decide_generation(status, completed_tasks.len(), incomplete_tasks.len());

        info!(
            "Page {}: status {:?}, {} completed, {} incomplete",
            page_id,
            status,
            completed_tasks.len(),
            incomplete_tasks.len()
        );
        if !should_generate_tweet {
            warn!("Skipping tweet generation: {}", reason);
        }

        Ok(PageAnalysis {
            status,
            completed_tasks,
            incomplete_tasks,
            should_generate_tweet,
            reason: reason.to_string(),
        })
    }
}
