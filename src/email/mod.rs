//! Operator e-mail: a transport seam and the notifications built on top of it.

mod notifier;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;

use crate::config::EmailSettings;
use crate::error::BoxError;

pub use notifier::Notifier;

/// One outgoing message. `html` and `text` are both optional, at least one is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    #[serde(skip)]
    pub to: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), BoxError>;
}

/// Sends mail through a transactional mail HTTP API (Resend-compatible JSON).
pub struct HttpMailTransport {
    http: Client,
    api_url: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    #[serde(flatten)]
    message: &'a MailMessage,
}

impl HttpMailTransport {
    /// Fails when the API key or the sender address is missing.
    pub fn new(http: Client, settings: &EmailSettings) -> Result<Self, BoxError> {
        let api_key = settings.api_key.clone().ok_or("EMAIL_API_KEY is not set")?;
        let from = settings.from.clone().ok_or("EMAIL_FROM is not set")?;
        info!("Mail transport initialized (from: {})", from);

        Ok(HttpMailTransport {
            http,
            api_url: settings.api_url.clone(),
            api_key,
            from,
        })
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), BoxError> {
        debug!("Sending mail '{}' to {}", message.subject, message.to);
        let request = SendRequest {
            from: &self.from,
            to: [&message.to],
            message,
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Mail API error ({}): {}", status, body).into());
        }
        Ok(())
    }
}
