//! Tweet content: sizing, generation, thread segmentation and validation.
//!
//! The flow for one run is: [`analyze_content`] picks a [`ContentShape`] from the
//! combined task text, the [`ContentGenerator`] asks the text model for copy in that
//! shape, [`segment_thread`] turns thread responses into bounded pieces, and
//! [`validate_twitter_content`] checks every piece before anything is published.

mod analysis;
pub mod generator;
pub mod processing;
mod segmenter;
mod validation;

use serde::{Deserialize, Serialize};

pub use analysis::{analyze_content, combine_task_text, ContentAnalysis};
pub use generator::{ContentGenerator, TextGenerator};
pub use segmenter::segment_thread;
pub use validation::validate_twitter_content;

/// A to-do item read from the task source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    /// Body text; for Notion to-dos this is `"<section heading>: <title>"`.
    pub content: String,
    pub completed: bool,
    /// Date the task was read, `YYYY-MM-DD`.
    pub date: String,
}

/// How the combined task text should be turned into a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentShape {
    /// Short enough to ask for one tweet directly.
    Single,
    /// Ask for one tweet, compressed; escalate to a thread if it still overflows.
    Summarized,
    /// Ask for a multi-part thread.
    Thread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

/// Generated copy ready for validation and publishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum GeneratedContent {
    Single(String),
    Thread(Vec<String>),
}

impl GeneratedContent {
    pub fn kind(&self) -> &'static str {
        match self {
            GeneratedContent::Single(_) => "single",
            GeneratedContent::Thread(_) => "thread",
        }
    }

    /// Number of posts this content will produce.
    pub fn tweet_count(&self) -> usize {
        match self {
            GeneratedContent::Single(_) => 1,
            GeneratedContent::Thread(tweets) => tweets.len(),
        }
    }
}

/// Outcome of publishing: the ids that went live and, on failure, why it stopped.
///
/// On a mid-thread failure `tweet_ids` is the prefix that was published.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishResult {
    pub tweet_ids: Vec<String>,
    pub error: Option<String>,
}

impl PublishResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Length in characters, the unit the platform limit is expressed in.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// First `max` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
