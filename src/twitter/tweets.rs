//! Tweet operations for Twitter API.
//!
//! This module contains the HTTP client for posting tweets and replies and for
//! verifying credentials, using the Twitter API v2.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde_json::json;
use tokio::sync::Mutex;

use super::api::{make_authenticated_request, sanitize_for_logging};
use super::TweetPoster;
use crate::config::TwitterConfig;
use crate::error::BoxError;
use crate::oauth::TWITTER_TOKEN_URL;

/// Twitter/X API v2 client using OAuth 2.0 User Context authentication.
///
/// Built once per process and shared; the access token is kept behind a lock so a
/// refresh performed by one request is seen by the next.
pub struct TwitterClient {
    http: Client,
    base_url: String,
    token_url: String,
    config: Mutex<TwitterConfig>,
}

impl TwitterClient {
    pub fn new(http: Client, base_url: impl Into<String>, config: TwitterConfig) -> Self {
        TwitterClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_url: TWITTER_TOKEN_URL.to_string(),
            config: Mutex::new(config),
        }
    }

    /// Posts a tweet, as a reply when `reply_to_tweet_id` is given.
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The id of the new tweet
    /// - `Err(BoxError)`: If authentication fails, network error, or API error
    ///
    /// # Errors
    ///
    /// This function can fail for several reasons:
    /// - Missing or invalid Twitter API credentials
    /// - Network connectivity issues
    /// - Twitter API rate limiting or other API errors
    /// - Invalid tweet content (too long, duplicate, etc.)
    pub async fn post_tweet(
        &self,
        text: &str,
        reply_to_tweet_id: Option<&str>,
    ) -> Result<String, BoxError> {
        info!(
            "Starting tweet post operation ({} chars, reply to: {})",
            text.chars().count(),
            reply_to_tweet_id.unwrap_or("none")
        );
        debug!("Tweet text: '{}'", sanitize_for_logging(text, 80));

        let url = format!("{}/tweets", self.base_url);
        let payload = match reply_to_tweet_id {
            Some(id) => json!({
                "text": text,
                "reply": { "in_reply_to_tweet_id": id }
            }),
            None => json!({ "text": text }),
        };
        debug!("Request headers: Authorization: Bearer [REDACTED], Content-Type: application/json");

        let response_text = make_authenticated_request(
            &self.http,
            &self.config,
            &self.token_url,
            |auth_header| {
                self.http
                    .post(&url)
                    .header("Authorization", auth_header)
                    .header("Content-Type", "application/json")
                    .json(&payload)
            },
            "post_tweet",
        )
        .await?;

        let tweet_id = parse_tweet_id(&response_text)?;
        info!("Tweet posted with id {}", tweet_id);
        Ok(tweet_id)
    }

    /// Looks up the authenticated user to confirm the credentials work.
    pub async fn verify_credentials(&self) -> Result<String, BoxError> {
        info!("Verifying Twitter connection");
        let url = format!("{}/users/me", self.base_url);

        let response_text = make_authenticated_request(
            &self.http,
            &self.config,
            &self.token_url,
            |auth_header| self.http.get(&url).header("Authorization", auth_header),
            "verify_credentials",
        )
        .await?;

        let json: serde_json::Value = serde_json::from_str(&response_text)?;
        let username = json
            .get("data")
            .and_then(|d| d.get("username"))
            .and_then(|v| v.as_str())
            .ok_or("No username in users/me response")?;
        info!("Twitter connection verified for @{}", username);
        Ok(username.to_string())
    }
}

#[async_trait]
impl TweetPoster for TwitterClient {
    async fn post(&self, text: &str, reply_to: Option<&str>) -> Result<String, BoxError> {
        self.post_tweet(text, reply_to).await
    }

    async fn verify_connection(&self) -> Result<String, BoxError> {
        self.verify_credentials().await
    }
}

/// Extracts `data.id` from a create-tweet response body.
pub(crate) fn parse_tweet_id(response_text: &str) -> Result<String, BoxError> {
    let json: serde_json::Value = serde_json::from_str(response_text)?;
    json.get("data")
        .and_then(|data| data.get("id"))
        .and_then(|id| id.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            format!(
                "No tweet id in response: {}",
                sanitize_for_logging(response_text, 200)
            )
            .into()
        })
}
