//! # Tasktweet Library
//!
//! A Rust web service that turns completed Notion to-dos into tweets. Each run reads
//! a Notion page, asks Gemini for copy sized to the task text, publishes it as a
//! single tweet or a reply-chained thread on X, and mails the operator the result.
//!
//! ## Features
//!
//! - Content sizing: single tweet, summarized tweet or thread, by combined text length
//! - Thread segmentation with `i/n` counters and per-piece length validation
//! - Sequential thread publishing with reply chaining and pacing
//! - Error and success mail with retries and a fallback address
//! - Optional cron-scheduled runs
//!
//! ## Configuration
//!
//! Configuration is read from environment variables, see [`Settings::from_env`].
//! Required: `NOTION_API_KEY`, `xapi_access_token`, `GEMINI_API_KEY`,
//! `EMAIL_API_KEY`, `EMAIL_FROM`, `ERROR_NOTIFICATION_EMAIL`.
//!
//! ## API Endpoints
//!
//! - `GET /`: Returns a welcome message
//! - `GET /health`: Returns service health status
//! - `GET /automate`: Reports whether the configuration is complete
//! - `POST /automate`: Runs the workflow for one Notion page
//! - `GET /status`: Service status, `?detailed=true` checks every integration

pub mod config;
pub mod content;
pub mod cronjob;
pub mod email;
pub mod error;
pub mod gemini;
pub mod handlers;
pub mod notion;
pub mod oauth;
pub mod twitter;
pub mod workflow;

// Re-export commonly used types and functions
pub use config::{get_server_port, ContentLimits, Settings, TwitterConfig};
pub use content::{
    analyze_content, segment_thread, validate_twitter_content, GeneratedContent, PublishResult,
    Task,
};
pub use cronjob::start_automation_cronjob;
pub use error::{AutomationError, BoxError, PublishError, Stage};
pub use handlers::{
    handle_automate_get, handle_automate_post, handle_health, handle_root, handle_status, AppState,
};
pub use oauth::build_oauth2_user_context_header;
pub use twitter::ThreadPublisher;
pub use workflow::{Automation, AutomationReport, Services};

#[cfg(test)]
mod tests;
