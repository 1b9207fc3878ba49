//! Core Twitter API utilities.
//!
//! This module contains low-level API utilities for making authenticated requests
//! to the Twitter API, including automatic token refresh on 401 errors.

use log::{debug, error, info, warn};
use reqwest::{Client, RequestBuilder};
use tokio::sync::Mutex;

use crate::config::TwitterConfig;
use crate::error::BoxError;
use crate::oauth::build_oauth2_user_context_header;

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// This function:
/// - Truncates long text to prevent log flooding
/// - Replaces control characters that could manipulate log output
/// - Escapes newlines to prevent log injection
pub(crate) fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    let total_chars = sanitized.chars().count();
    if total_chars > max_len {
        let head: String = sanitized.chars().take(max_len).collect();
        format!("{}... [truncated, {} total chars]", head, total_chars)
    } else {
        sanitized
    }
}

/// Makes an authenticated request to the Twitter API with automatic token refresh on 401 errors.
///
/// `build_request` receives the current `Authorization` header value and returns a
/// request ready to send; it is called again with the new header after a refresh.
///
/// # Returns
///
/// - `Ok(String)`: The API response body on success
/// - `Err(BoxError)`: If the request fails or token refresh fails
pub(crate) async fn make_authenticated_request<F>(
    http: &Client,
    config: &Mutex<TwitterConfig>,
    token_url: &str,
    build_request: F,
    operation_name: &str,
) -> Result<String, BoxError>
where
    F: Fn(String) -> RequestBuilder,
{
    info!(
        "Making authenticated request for operation: {}",
        operation_name
    );

    let access_token = config.lock().await.access_token.clone();
    let response = build_request(build_oauth2_user_context_header(&access_token))
        .send()
        .await?;

    let status = response.status();
    info!(
        "Received response with status: {} for operation: {}",
        status, operation_name
    );

    if status.is_success() {
        let response_text = response.text().await?;
        debug!(
            "Response summary for '{}': {} bytes received",
            operation_name,
            response_text.len()
        );
        return Ok(response_text);
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        warn!(
            "Received 401 Unauthorized for operation '{}' - access token may be expired",
            operation_name
        );

        let new_token = {
            let mut guard = config.lock().await;
            if !guard.can_refresh_token() {
                error!(
                    "Cannot refresh token for operation '{}' - missing refresh credentials",
                    operation_name
                );
                return Err(format!(
                    "Twitter API error (401) for operation '{}' and token refresh not available",
                    operation_name
                )
                .into());
            }
            // Another request may have refreshed while this one was in flight.
            if guard.access_token == access_token {
                guard.refresh_access_token(http, token_url).await.map_err(|e| {
                    error!("Token refresh failed for operation '{}': {}", operation_name, e);
                    format!("Token refresh failed for operation '{}': {}", operation_name, e)
                })?;
            }
            guard.access_token.clone()
        };

        info!(
            "Token refreshed successfully, retrying operation '{}'",
            operation_name
        );
        let retry_response = build_request(build_oauth2_user_context_header(&new_token))
            .send()
            .await?;
        let retry_status = retry_response.status();
        let body = retry_response.text().await?;

        if retry_status.is_success() {
            info!(
                "Operation '{}' completed successfully after token refresh",
                operation_name
            );
            return Ok(body);
        }

        error!(
            "Operation '{}' failed after token refresh - Status: {}",
            operation_name, retry_status
        );
        debug!(
            "Error response for '{}': {}",
            operation_name,
            sanitize_for_logging(&body, 200)
        );
        return Err(format!(
            "Twitter API error after token refresh ({}): {}",
            retry_status,
            sanitize_for_logging(&body, 200)
        )
        .into());
    }

    let error_text = response.text().await?;
    error!("Operation '{}' failed - Status: {}", operation_name, status);
    debug!(
        "Error response for '{}': {}",
        operation_name,
        sanitize_for_logging(&error_text, 200)
    );
    Err(format!(
        "Twitter API error for operation '{}' ({}): {}",
        operation_name,
        status,
        sanitize_for_logging(&error_text, 200)
    )
    .into())
}
