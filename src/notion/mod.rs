//! Notion integration: reads the to-do blocks of a page and decides whether a
//! tweet should be generated for it.

mod client;
mod parsing;

use async_trait::async_trait;
use serde::Serialize;

use crate::content::Task;
use crate::error::BoxError;

pub use client::NotionClient;
pub use parsing::{decide_generation, extract_tasks, page_status_from_properties};

/// Overall page status, read from a `status`/`select` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageStatus {
    Done,
    NotDone,
}

/// Tasks found on a page plus the decision whether to tweet about them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageAnalysis {
    pub status: PageStatus,
    pub completed_tasks: Vec<Task>,
    pub incomplete_tasks: Vec<Task>,
    pub should_generate_tweet: bool,
    pub reason: String,
}

/// A source of tasks, keyed by page id.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Reads status and to-dos of a page and applies the generation policy.
    async fn analyze_page(&self, page_id: &str) -> Result<PageAnalysis, BoxError>;

    /// Returns only the checked to-dos of a page.
    async fn completed_tasks(&self, page_id: &str) -> Result<Vec<Task>, BoxError> {
        Ok(self.analyze_page(page_id).await?.completed_tasks)
    }
}
