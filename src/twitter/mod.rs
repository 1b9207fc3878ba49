//! Twitter/X API integration module.
//!
//! This module contains the posting seam used by the automation workflow, the
//! OAuth 2.0 User Context HTTP client that implements it, and the thread
//! publisher that chains replies.

mod api;
mod thread;
mod tweets;

use async_trait::async_trait;

use crate::error::BoxError;

pub use thread::ThreadPublisher;
pub use tweets::TwitterClient;

/// A social posting service.
#[async_trait]
pub trait TweetPoster: Send + Sync {
    /// Publishes `text`, optionally as a reply, and returns the new post id.
    async fn post(&self, text: &str, reply_to: Option<&str>) -> Result<String, BoxError>;

    /// Checks the credentials, returning the authenticated username.
    async fn verify_connection(&self) -> Result<String, BoxError>;
}
