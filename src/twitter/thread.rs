//! Sequential publishing of tweets and reply-chained threads.

use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use super::TweetPoster;
use crate::config::ContentLimits;
use crate::content::{char_len, GeneratedContent, PublishResult};
use crate::error::PublishError;

/// Publishes generated content through a [`TweetPoster`].
///
/// Thread pieces are posted one at a time, each replying to the previous one,
/// with a fixed pause between posts. Publishing stops at the first failure and
/// nothing already posted is rolled back.
pub struct ThreadPublisher {
    poster: Arc<dyn TweetPoster>,
    limit: usize,
    pacing: Duration,
}

impl ThreadPublisher {
    pub fn new(poster: Arc<dyn TweetPoster>, limits: &ContentLimits) -> Self {
        ThreadPublisher {
            poster,
            limit: limits.tweet_char_limit,
            pacing: limits.thread_pacing,
        }
    }

    /// Publishes `content` and reports the outcome without failing.
    pub async fn post_twitter_content(&self, content: &GeneratedContent) -> PublishResult {
        info!("Posting to Twitter ({})", content.kind());
        match self.publish_content(content).await {
            Ok(tweet_ids) => PublishResult {
                tweet_ids,
                error: None,
            },
            Err(e) => {
                error!("Publishing failed: {}", e);
                PublishResult {
                    tweet_ids: e.posted_ids().to_vec(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Publishes a single tweet or a thread, returning the ids in order.
    pub async fn publish_content(
        &self,
        content: &GeneratedContent,
    ) -> Result<Vec<String>, PublishError> {
        match content {
            GeneratedContent::Single(text) => {
                self.check_lengths(std::slice::from_ref(text))?;
                info!("Posting single tweet ({} chars)", char_len(text));
                let id = self
                    .poster
                    .post(text, None)
                    .await
                    .map_err(|source| PublishError::PostFailed {
                        index: 1,
                        total: 1,
                        succeeded: 0,
                        posted_ids: Vec::new(),
                        source,
                    })?;
                info!("Single tweet posted successfully: {}", id);
                Ok(vec![id])
            }
            GeneratedContent::Thread(tweets) => self.publish_thread(tweets).await,
        }
    }

    /// Posts `tweets` as a reply chain.
    ///
    /// Empty input and over-long pieces are rejected before any network call. On
    /// success the returned ids match `tweets` one to one.
    pub async fn publish_thread(&self, tweets: &[String]) -> Result<Vec<String>, PublishError> {
        info!("Posting Twitter thread with {} tweets", tweets.len());

        if tweets.is_empty() {
            return Err(PublishError::EmptyThread);
        }
        self.check_lengths(tweets)?;

        let total = tweets.len();
        let mut tweet_ids: Vec<String> = Vec::with_capacity(total);

        for (i, text) in tweets.iter().enumerate() {
            let reply_to = tweet_ids.last().map(String::as_str);
            info!(
                "Posting tweet {}/{} ({} chars, reply to: {})",
                i + 1,
                total,
                char_len(text),
                reply_to.unwrap_or("none")
            );

            match self.poster.post(text, reply_to).await {
                Ok(id) => {
                    info!("Tweet {}/{} posted successfully: {}", i + 1, total, id);
                    tweet_ids.push(id);
                }
                Err(source) => {
                    let succeeded = tweet_ids.len();
                    if succeeded > 0 {
                        warn!(
                            "Thread left partially published: {} of {} tweets are live",
                            succeeded, total
                        );
                    }
                    return Err(PublishError::PostFailed {
                        index: i + 1,
                        total,
                        succeeded,
                        posted_ids: tweet_ids,
                        source,
                    });
                }
            }

            if i + 1 < total && !self.pacing.is_zero() {
                info!("Waiting {:?} before posting next tweet", self.pacing);
                tokio::time::sleep(self.pacing).await;
            }
        }

        info!("Thread posted successfully: {:?}", tweet_ids);
        Ok(tweet_ids)
    }

    fn check_lengths(&self, tweets: &[String]) -> Result<(), PublishError> {
        let total = tweets.len();
        for (i, tweet) in tweets.iter().enumerate() {
            let length = char_len(tweet);
            if length > self.limit {
                return Err(PublishError::TweetTooLong {
                    index: i + 1,
                    total,
                    length,
                    limit: self.limit,
                });
            }
        }
        Ok(())
    }
}
