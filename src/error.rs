//! Error types shared across the automation pipeline.
//!
//! External service calls return [`BoxError`] and are propagated with `?`.
//! Errors a caller needs to inspect (which tweet failed, which stage broke)
//! are typed.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Boxed error used by every collaborator call.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures raised while publishing a tweet or thread.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Cannot post empty thread - no tweets provided")]
    EmptyThread,

    #[error("Tweet {index}/{total} exceeds {limit} character limit: {length} characters")]
    TweetTooLong {
        index: usize,
        total: usize,
        length: usize,
        limit: usize,
    },

    #[error("Failed to post tweet {index}/{total}: {source}. Posted {succeeded} tweets before failure.")]
    PostFailed {
        /// 1-based position of the piece that failed.
        index: usize,
        total: usize,
        succeeded: usize,
        /// Ids published before the failure, in order.
        posted_ids: Vec<String>,
        #[source]
        source: BoxError,
    },
}

impl PublishError {
    /// Ids that are already live on the platform when this error was raised.
    pub fn posted_ids(&self) -> &[String] {
        match self {
            PublishError::PostFailed { posted_ids, .. } => posted_ids,
            _ => &[],
        }
    }
}

/// Workflow stage, used to tag failures so callers can report where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Initialization,
    EnvironmentValidation,
    NotionDataFetch,
    ContentAnalysis,
    AiContentGeneration,
    ContentValidation,
    TwitterPosting,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Initialization => "initialization",
            Stage::EnvironmentValidation => "environment-validation",
            Stage::NotionDataFetch => "notion-data-fetch",
            Stage::ContentAnalysis => "content-analysis",
            Stage::AiContentGeneration => "ai-content-generation",
            Stage::ContentValidation => "content-validation",
            Stage::TwitterPosting => "twitter-posting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error tagged with the workflow stage it occurred in.
#[derive(Debug, Error)]
#[error("[{stage}] {message}")]
pub struct AutomationError {
    pub stage: Stage,
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
    /// Tweets already live when the run stopped.
    pub posted_ids: Vec<String>,
}

impl AutomationError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        AutomationError {
            stage,
            message: message.into(),
            source: None,
            posted_ids: Vec::new(),
        }
    }

    /// Wraps a collaborator error, keeping its message.
    pub fn from_source(stage: Stage, source: BoxError) -> Self {
        AutomationError {
            stage,
            message: source.to_string(),
            source: Some(source),
            posted_ids: Vec::new(),
        }
    }

    pub fn with_posted_ids(mut self, posted_ids: Vec<String>) -> Self {
        self.posted_ids = posted_ids;
        self
    }
}
