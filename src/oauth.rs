//! OAuth 2.0 helpers for Twitter/X API integration.
//!
//! Posting uses OAuth 2.0 User Context authentication. Access tokens expire, so
//! this module also performs the refresh-token exchange.

use log::{debug, error, info};

use crate::error::BoxError;

/// Token endpoint used for the refresh-token grant.
pub const TWITTER_TOKEN_URL: &str = "https://api.x.com/2/oauth2/token";

/// Builds the Authorization header for OAuth 2.0 User Context authentication.
///
/// # Example
///
/// ```rust
/// use tasktweet::build_oauth2_user_context_header;
///
/// let header = build_oauth2_user_context_header("your_access_token");
/// assert_eq!(header, "Bearer your_access_token");
/// ```
pub fn build_oauth2_user_context_header(access_token: &str) -> String {
    format!("Bearer {}", access_token)
}

/// Exchanges a refresh token for a new access token.
///
/// # Returns
///
/// - `Ok((access_token, Some(refresh_token)))` when Twitter rotated the refresh token
/// - `Ok((access_token, None))` when only the access token was issued
/// - `Err(...)` on network failure, a non-success status or a malformed body
pub async fn refresh_access_token(
    http: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<(String, Option<String>), BoxError> {
    info!("Exchanging refresh token at {}", token_url);

    let params = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];

    let response = http
        .post(token_url)
        .basic_auth(client_id, Some(client_secret))
        .form(&params)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        error!("Token refresh failed with status {}", status);
        debug!("Token refresh error body: {} bytes", body.len());
        return Err(format!("Token refresh failed ({})", status).into());
    }

    let json: serde_json::Value = serde_json::from_str(&body)?;
    let access_token = json
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or("No access_token in token refresh response")?
        .to_string();
    let new_refresh_token = json
        .get("refresh_token")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    info!(
        "Token refresh succeeded (refresh token rotated: {})",
        new_refresh_token.is_some()
    );
    Ok((access_token, new_refresh_token))
}
