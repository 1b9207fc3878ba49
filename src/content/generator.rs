//! Turns completed tasks into tweet copy using a text generation model.

use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;

use super::processing::{add_default_hashtags, sanitize_content};
use super::{analyze_content, char_len, combine_task_text, segment_thread};
use super::{ContentShape, GeneratedContent, Task};
use crate::config::ContentLimits;
use crate::error::BoxError;

/// A text generation service: one prompt in, one free-form string out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, BoxError>;
}

/// Picks a generation strategy from the task text size and asks the model for copy.
pub struct ContentGenerator {
    model: Arc<dyn TextGenerator>,
    limits: ContentLimits,
}

impl ContentGenerator {
    pub fn new(model: Arc<dyn TextGenerator>, limits: ContentLimits) -> Self {
        ContentGenerator { model, limits }
    }

    /// Generates a single tweet or a thread for `tasks`.
    ///
    /// Single and summarized responses that still exceed the platform limit are
    /// regenerated as a thread.
    pub async fn create_twitter_post(&self, tasks: &[Task]) -> Result<GeneratedContent, BoxError> {
        info!("Creating Twitter post from {} tasks", tasks.len());

        let combined = combine_task_text(tasks);
        let analysis = analyze_content(tasks, &self.limits);
        info!("Combined content length: {} characters", analysis.total_length);

        match analysis.content_type {
            ContentShape::Single => {
                let prompt = single_tweet_prompt(&combined, self.limits.tweet_char_limit);
                self.single_or_thread(&combined, &prompt, "single").await
            }
            ContentShape::Summarized => {
                let prompt = summary_prompt(&combined, self.limits.tweet_char_limit);
                self.single_or_thread(&combined, &prompt, "summarized").await
            }
            ContentShape::Thread => self.create_thread(&combined).await,
        }
    }

    async fn single_or_thread(
        &self,
        combined: &str,
        prompt: &str,
        label: &str,
    ) -> Result<GeneratedContent, BoxError> {
        let tweet = sanitize_content(&self.model.generate(prompt).await?);
        let length = char_len(&tweet);

        if length > self.limits.tweet_char_limit {
            warn!(
                "Generated {} tweet is {} chars, creating thread instead",
                label, length
            );
            return self.create_thread(combined).await;
        }
        if tweet.is_empty() {
            return Err(format!("Model returned an empty {} tweet", label).into());
        }

        let tags: Vec<&str> = self.limits.default_hashtags.iter().map(String::as_str).collect();
        let tweet = add_default_hashtags(&tweet, &tags, self.limits.tweet_char_limit);

        info!("Generated {} tweet ({} chars)", label, char_len(&tweet));
        Ok(GeneratedContent::Single(tweet))
    }

    async fn create_thread(&self, combined: &str) -> Result<GeneratedContent, BoxError> {
        let prompt = thread_prompt(combined, &self.limits);
        let response = self.model.generate(&prompt).await?;
        let tweets = segment_thread(&response, &self.limits);

        if tweets.is_empty() {
            return Err("Model returned an empty thread response".into());
        }
        info!("Generated Twitter thread with {} tweets", tweets.len());
        Ok(GeneratedContent::Thread(tweets))
    }
}

fn single_tweet_prompt(content: &str, limit: usize) -> String {
    format!(
        "Create a Twitter post from these completed tasks. Must be {limit} characters or less.

Tasks:
{content}

Requirements:
- MAXIMUM {limit} characters
- Include relevant emojis
- Professional but approachable tone
- Engaging for followers

Tweet:"
    )
}

fn summary_prompt(content: &str, limit: usize) -> String {
    format!(
        "Summarize the following tasks into a single Twitter post that is EXACTLY {limit} characters or less.

Content to summarize:
{content}

Requirements:
- MAXIMUM {limit} characters (this is critical - count every character)
- Include relevant emojis to save space
- Focus only on the most important achievements
- Be concise but engaging
- Professional but personable tone

Return only the tweet text, no extra formatting:"
    )
}

fn thread_prompt(content: &str, limits: &ContentLimits) -> String {
    let limit = limits.tweet_char_limit;
    let length_rule = match limits.max_thread_tweets {
        Some(cap) => format!("- Use at most {cap} tweets"),
        None => "- Continue with as many tweets as needed to cover all details".to_string(),
    };
    format!(
        "Create a comprehensive Twitter thread from today's accomplished tasks.

Tasks completed today:
{content}

Requirements:
- Each tweet MAXIMUM {limit} characters
- First tweet: Engaging summary of main achievements
{length_rule}
- Include relevant emojis
- Professional but approachable tone
- Natural flow between tweets
- Group related topics together in consecutive tweets

Format your response as:
Tweet 1: [engaging summary]
Tweet 2: [first detailed topic]
Tweet 3: [continuation or next topic]
...
Tweet N: [conclusion/final thoughts]

Thread:"
    )
}
