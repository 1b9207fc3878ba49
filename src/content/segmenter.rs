//! Thread segmentation of free-form model output.
//!
//! The model is asked for `Tweet <n>: <text>` lines but does not always comply.
//! Three strategies are tried in order and the first non-empty result wins:
//!
//! 1. numbered `Tweet <n>:` lines
//! 2. text split on inline `i/n` counters
//! 3. greedy word wrap
//!
//! The result is then capped to the configured piece count and every piece gets an
//! `i/n` counter. Segmentation never fails: if anything goes wrong the caller gets
//! the first `limit` characters of the raw text as a single piece.

use log::{debug, error, warn};
use regex::Regex;

use super::{char_len, truncate_chars};
use crate::config::ContentLimits;
use crate::error::BoxError;

type Strategy = fn(&str, usize) -> Result<Vec<String>, BoxError>;

const STRATEGIES: [(&str, Strategy); 3] = [
    ("numbered lines", extract_numbered_lines),
    ("inline counters", split_on_counters),
    ("word wrap", wrap_words),
];

/// Turns a model response into an ordered list of tweets, each within
/// `limits.tweet_char_limit` characters including its `i/n` counter.
///
/// Returns an empty list only when `raw` is blank.
pub fn segment_thread(raw: &str, limits: &ContentLimits) -> Vec<String> {
    if raw.trim().is_empty() {
        warn!("Thread response is empty - nothing to segment");
        return Vec::new();
    }

    match try_segment(raw, limits) {
        Ok(tweets) if !tweets.is_empty() => tweets,
        Ok(_) => {
            warn!("Thread segmentation produced no pieces - using raw text");
            raw_text_fallback(raw, limits.tweet_char_limit)
        }
        Err(e) => {
            error!("Error parsing thread response: {} - using raw text", e);
            raw_text_fallback(raw, limits.tweet_char_limit)
        }
    }
}

fn try_segment(raw: &str, limits: &ContentLimits) -> Result<Vec<String>, BoxError> {
    let limit = limits.tweet_char_limit;
    let mut pieces = Vec::new();

    for (name, strategy) in STRATEGIES {
        pieces = strategy(raw, limit)?;
        if !pieces.is_empty() {
            debug!("Segmented thread with {} strategy: {} pieces", name, pieces.len());
            break;
        }
        debug!("Segmentation strategy '{}' found nothing", name);
    }

    if let Some(cap) = limits.max_thread_tweets {
        if pieces.len() > cap {
            warn!(
                "Thread has {} pieces, dropping the last {} to fit the cap of {}",
                pieces.len(),
                pieces.len() - cap,
                cap
            );
            pieces.truncate(cap);
        }
    }

    Ok(add_counters(pieces, limit))
}

/// Collects the text of `Tweet <n>: <text>` lines, tolerating markdown emphasis
/// around the label. Over-long content is cut at the limit.
fn extract_numbered_lines(raw: &str, limit: usize) -> Result<Vec<String>, BoxError> {
    let re = Regex::new(r"^\s*\**Tweet\s+\d+\**\s*:\**\s*(.+)$")?;

    let mut tweets = Vec::new();
    for line in raw.lines() {
        let Some(content) = re.captures(line).and_then(|caps| caps.get(1)) else {
            continue;
        };
        let content = content.as_str().trim();
        if content.is_empty() {
            continue;
        }
        let length = char_len(content);
        if length > limit {
            warn!(
                "Tweet {} is {} chars, will be truncated to {}",
                tweets.len() + 1,
                length,
                limit
            );
        }
        tweets.push(truncate_chars(content, limit).to_string());
    }
    Ok(tweets)
}

/// Splits on inline `i/n` thread counters. Text without any counter yields nothing
/// so that it falls through to word wrapping instead of being cut to one tweet.
fn split_on_counters(raw: &str, limit: usize) -> Result<Vec<String>, BoxError> {
    let re = Regex::new(r"\d+/\d+")?;
    if !re.is_match(raw) {
        return Ok(Vec::new());
    }

    Ok(re
        .split(raw)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| truncate_chars(piece, limit).to_string())
        .collect())
}

/// Greedily packs whitespace-separated words into chunks of at most `limit`
/// characters. A word longer than the limit becomes its own truncated chunk.
fn wrap_words(raw: &str, limit: usize) -> Result<Vec<String>, BoxError> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in raw.split_whitespace() {
        let word_len = char_len(word);
        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };

        if needed <= limit {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_len = needed;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if word_len > limit {
            chunks.push(truncate_chars(word, limit).to_string());
        } else {
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    Ok(chunks)
}

/// Prefixes `i/n ` to every piece that does not already carry its own counter,
/// cutting the body so the result stays within `limit`.
fn add_counters(pieces: Vec<String>, limit: usize) -> Vec<String> {
    let total = pieces.len();

    pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| {
            let counter = format!("{}/{}", i + 1, total);
            if piece.contains(&counter) {
                return piece;
            }
            let available = limit.saturating_sub(char_len(&counter) + 1);
            if available == 0 {
                // No room for a counter at all.
                return truncate_chars(&piece, limit).to_string();
            }
            let body = truncate_chars(&piece, available).trim_end();
            format!("{} {}", counter, body)
        })
        .filter(|tweet| !tweet.trim().is_empty())
        .collect()
}

fn raw_text_fallback(raw: &str, limit: usize) -> Vec<String> {
    let piece = truncate_chars(raw.trim(), limit).to_string();
    if piece.is_empty() {
        Vec::new()
    } else {
        vec![piece]
    }
}
