//! Thread Preview Utility
//!
//! Runs the thread segmenter and validator on model-style text without posting
//! anything. Reads the file named by the first argument, or stdin.
//!
//! ```bash
//! echo "Tweet 1: Hello\nTweet 2: World" | cargo run --bin preview_thread
//! TWEET_CHAR_LIMIT=265 cargo run --bin preview_thread -- response.txt
//! ```

use std::io::{self, Read};

use tasktweet::content::processing::format_content_for_display;
use tasktweet::{segment_thread, validate_twitter_content, ContentLimits, GeneratedContent};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            input
        }
    };

    let limits = ContentLimits::from_env();
    let content = GeneratedContent::Thread(segment_thread(&raw, &limits));
    let valid = validate_twitter_content(&content, limits.tweet_char_limit);

    println!("{}", format_content_for_display(&content));
    println!();
    if let GeneratedContent::Thread(tweets) = &content {
        for (i, tweet) in tweets.iter().enumerate() {
            println!(
                "  piece {}: {}/{} chars",
                i + 1,
                tweet.chars().count(),
                limits.tweet_char_limit
            );
        }
    }
    println!(
        "{} pieces, {}",
        content.tweet_count(),
        if valid { "✅ valid" } else { "❌ invalid" }
    );

    if !valid {
        std::process::exit(1);
    }
    Ok(())
}
