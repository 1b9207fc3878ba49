use chrono::Utc;
use chrono_tz::Tz;
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{MailMessage, MailTransport};
use crate::config::EmailSettings;
use crate::content::processing::truncate_content;
use crate::content::{GeneratedContent, PublishResult};

const TWEET_LINK_PREFIX: &str = "https://twitter.com/i/web/status/";

/// Best-effort operator notifications. No method here ever returns an error.
pub struct Notifier {
    transport: Arc<dyn MailTransport>,
    to: Option<String>,
    fallback_to: Option<String>,
    retries: u32,
    backoff: Duration,
    timezone: Tz,
}

impl Notifier {
    pub fn new(transport: Arc<dyn MailTransport>, settings: &EmailSettings, timezone: Tz) -> Self {
        Notifier {
            transport,
            to: settings.to.clone(),
            fallback_to: settings.fallback_to.clone(),
            retries: settings.retries.max(1),
            backoff: settings.backoff,
            timezone,
        }
    }

    fn local_time(&self) -> String {
        Utc::now()
            .with_timezone(&self.timezone)
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string()
    }

    fn recipient(&self) -> Option<&str> {
        match self.to.as_deref() {
            Some(to) => Some(to),
            None => {
                warn!("ERROR_NOTIFICATION_EMAIL is not set - skipping notification");
                None
            }
        }
    }

    /// Sends an error alert, retrying with linear backoff and falling back to
    /// `FALLBACK_EMAIL` once every attempt has failed.
    pub async fn notify_error(&self, message: &str, details: &str, context: &str) {
        let Some(to) = self.recipient() else {
            error!("[{}] {}", context, message);
            return;
        };

        let mut headers = HashMap::new();
        headers.insert("X-Priority".to_string(), "1".to_string());
        headers.insert("Importance".to_string(), "high".to_string());

        let mail = MailMessage {
            to: to.to_string(),
            subject: format!("Twitter Automation Error - {}", context),
            html: Some(error_html(message, details, context, &self.local_time())),
            text: None,
            headers,
        };

        for attempt in 1..=self.retries {
            match self.transport.send(&mail).await {
                Ok(()) => {
                    info!(
                        "Error notification sent (attempt {}, context: {})",
                        attempt, context
                    );
                    return;
                }
                Err(e) => {
                    error!(
                        "Failed to send error notification (attempt {}/{}): {}",
                        attempt, self.retries, e
                    );
                    if attempt < self.retries {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }

        self.send_fallback(to, message, details, context).await;
    }

    async fn send_fallback(&self, primary: &str, message: &str, details: &str, context: &str) {
        error!(
            "CRITICAL: all error notification attempts failed (context: {}): {}",
            context, message
        );

        let Some(fallback) = self.fallback_to.as_deref().filter(|f| *f != primary) else {
            return;
        };

        let mail = MailMessage {
            to: fallback.to_string(),
            subject: "CRITICAL: Twitter Automation Failure - Primary Email Failed".to_string(),
            html: None,
            text: Some(format!(
                "CRITICAL ERROR - Primary email notification system failed\n\n\
                 Original Error: {}\n\nDetails: {}\n\nContext: {}\n\nTime: {}\n\n\
                 This message was sent to the fallback address because primary notifications failed.",
                message,
                details,
                context,
                Utc::now().to_rfc3339()
            )),
            headers: HashMap::new(),
        };

        match self.transport.send(&mail).await {
            Ok(()) => info!("Fallback notification sent to {}", fallback),
            Err(e) => error!("Fallback notification also failed: {}", e),
        }
    }

    /// Reports a successful run. Failures are routed to [`Notifier::notify_error`].
    pub async fn send_success_notification(
        &self,
        content: &GeneratedContent,
        result: &PublishResult,
        task_count: usize,
    ) {
        let Some(to) = self.recipient() else {
            return;
        };

        let subject = format!(
            "Twitter Automation Success - {} task{} posted",
            task_count,
            if task_count == 1 { "" } else { "s" }
        );
        let mail = MailMessage {
            to: to.to_string(),
            subject: subject.clone(),
            html: Some(success_html(content, result, task_count, &self.local_time())),
            ..MailMessage::default()
        };

        match self.transport.send(&mail).await {
            Ok(()) => info!(
                "Success notification sent ({} tweets, {} tasks)",
                result.tweet_ids.len(),
                task_count
            ),
            Err(e) => {
                error!("Failed to send success notification: {}", e);
                self.notify_error(&e.to_string(), &subject, "send-success-notification")
                    .await;
            }
        }
    }

    pub async fn send_startup_notification(&self) {
        let Some(to) = self.recipient() else {
            return;
        };
        let mail = MailMessage {
            to: to.to_string(),
            subject: "Twitter Automation Service Started".to_string(),
            html: Some(format!(
                "<html><body><h2>Service Startup Notification</h2>\
                 <p>The automation service has started and is ready to process tasks.</p>\
                 <p><strong>Startup Time:</strong> {}</p></body></html>",
                html_escape(&self.local_time())
            )),
            ..MailMessage::default()
        };

        match self.transport.send(&mail).await {
            Ok(()) => info!("Startup notification sent"),
            Err(e) => error!("Failed to send startup notification: {}", e),
        }
    }

    /// Sends a test message; true when the transport accepted it.
    pub async fn test_connection(&self) -> bool {
        info!("Testing mail connection");
        let Some(to) = self.recipient() else {
            return false;
        };
        let mail = MailMessage {
            to: to.to_string(),
            subject: "Twitter Automation - Email Test".to_string(),
            html: Some(format!(
                "<html><body><h2>Email Connection Test</h2>\
                 <p>Notifications can be delivered.</p><p><strong>Test Time:</strong> {}</p>\
                 </body></html>",
                html_escape(&self.local_time())
            )),
            ..MailMessage::default()
        };

        match self.transport.send(&mail).await {
            Ok(()) => {
                info!("Test email sent");
                true
            }
            Err(e) => {
                self.notify_error(&e.to_string(), "", "test-email-connection").await;
                false
            }
        }
    }
}

fn error_html(message: &str, details: &str, context: &str, time: &str) -> String {
    format!(
        "<html><body style=\"font-family: Arial, sans-serif;\">\
         <h2>Twitter Automation Error Alert</h2>\
         <p><strong>Context:</strong> {}</p>\
         <p><strong>Time:</strong> {}</p>\
         <p style=\"font-family: monospace; font-weight: bold;\">{}</p>\
         <pre>{}</pre>\
         </body></html>",
        html_escape(context),
        html_escape(time),
        html_escape(message),
        html_escape(details)
    )
}

fn success_html(
    content: &GeneratedContent,
    result: &PublishResult,
    task_count: usize,
    time: &str,
) -> String {
    let preview = match content {
        GeneratedContent::Single(text) => truncate_content(text, 150),
        GeneratedContent::Thread(tweets) => format!("Thread with {} tweets", tweets.len()),
    };
    let links: String = result
        .tweet_ids
        .iter()
        .map(|id| {
            let link = format!("{}{}", TWEET_LINK_PREFIX, html_escape(id));
            format!("<div><a href=\"{0}\">{0}</a></div>", link)
        })
        .collect();

    format!(
        "<html><body style=\"font-family: Arial, sans-serif;\">\
         <h2>Twitter Automation Success</h2>\
         <p><strong>Tasks Processed:</strong> {}</p>\
         <p><strong>Content Type:</strong> {}</p>\
         <p><strong>Tweets Posted:</strong> {}</p>\
         <p><strong>Completion Time:</strong> {}</p>\
         <h4>Content Preview:</h4><p><em>\"{}\"</em></p>\
         {}\
         </body></html>",
        task_count,
        content.kind(),
        result.tweet_ids.len(),
        html_escape(time),
        html_escape(&preview),
        if links.is_empty() {
            String::new()
        } else {
            format!("<h4>Published Tweet Links:</h4>{}", links)
        }
    )
}

pub(crate) fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
