//! Pre-publish length checks.

use log::warn;

use super::{char_len, GeneratedContent};

/// Returns true when every post in `content` fits within `limit` characters.
/// A thread with no pieces is invalid.
pub fn validate_twitter_content(content: &GeneratedContent, limit: usize) -> bool {
    match content {
        GeneratedContent::Single(text) => {
            let length = char_len(text);
            if length > limit {
                warn!("Single tweet exceeds character limit: {} > {}", length, limit);
                return false;
            }
            true
        }
        GeneratedContent::Thread(tweets) => {
            if tweets.is_empty() {
                warn!("Thread has no tweets");
                return false;
            }
            for (i, tweet) in tweets.iter().enumerate() {
                let length = char_len(tweet);
                if length > limit {
                    warn!(
                        "Tweet {} exceeds character limit: {} > {}",
                        i + 1,
                        length,
                        limit
                    );
                    return false;
                }
            }
            true
        }
    }
}
