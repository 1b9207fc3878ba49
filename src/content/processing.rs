//! Small text helpers for preparing and displaying tweet copy.

use regex::Regex;

use super::{char_len, truncate_chars, GeneratedContent};

/// Normalises line endings, collapses runs of three or more newlines and trims.
pub fn sanitize_content(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    match Regex::new(r"\n{3,}") {
        Ok(re) => re.replace_all(&normalized, "\n\n").trim().to_string(),
        Err(_) => normalized.trim().to_string(),
    }
}

/// Shortens `content` to at most `max_length` characters, ending in `...`.
///
/// Cuts at the last space when that keeps more than 80% of `max_length`.
pub fn truncate_content(content: &str, max_length: usize) -> String {
    if char_len(content) <= max_length {
        return content.to_string();
    }

    let truncated = truncate_chars(content, max_length.saturating_sub(3));
    if let Some(last_space) = truncated.rfind(' ') {
        if char_len(&truncated[..last_space]) * 5 > max_length * 4 {
            return format!("{}...", &truncated[..last_space]);
        }
    }
    format!("{}...", truncated)
}

/// Unique hashtags in order of first appearance.
pub fn extract_hashtags(content: &str) -> Vec<String> {
    let Ok(re) = Regex::new(r"#\w+") else {
        return Vec::new();
    };
    let mut tags: Vec<String> = Vec::new();
    for m in re.find_iter(content) {
        if !tags.iter().any(|t| t == m.as_str()) {
            tags.push(m.as_str().to_string());
        }
    }
    tags
}

/// Appends the hashtags not already present, unless that would exceed `limit`.
pub fn add_default_hashtags(content: &str, hashtags: &[&str], limit: usize) -> String {
    let existing = extract_hashtags(content);
    let to_add: Vec<&str> = hashtags
        .iter()
        .copied()
        .filter(|tag| !existing.iter().any(|e| e == tag))
        .collect();

    if to_add.is_empty() {
        return content.to_string();
    }

    let proposed = format!("{} {}", content, to_add.join(" "));
    if char_len(&proposed) <= limit {
        proposed
    } else {
        content.to_string()
    }
}

/// Renders content for previews and logs: threads become `Tweet i/n: ...` blocks.
pub fn format_content_for_display(content: &GeneratedContent) -> String {
    match content {
        GeneratedContent::Single(text) => text.clone(),
        GeneratedContent::Thread(tweets) => tweets
            .iter()
            .enumerate()
            .map(|(i, tweet)| format!("Tweet {}/{}: {}", i + 1, tweets.len(), tweet))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_blank_runs() {
        assert_eq!(sanitize_content("  a\r\nb\r\n\r\n\r\n\nc  "), "a\nb\n\nc");
        assert_eq!(sanitize_content("x\ry"), "x\ny");
    }

    #[test]
    fn truncate_prefers_word_boundary() {
        let text = "The quick brown fox jumps over the lazy dog";
        assert_eq!(truncate_content(text, 100), text);

        let cut = truncate_content(text, 40);
        assert_eq!(cut, "The quick brown fox jumps over the...");
        assert!(char_len(&cut) <= 40);
    }

    #[test]
    fn truncate_hard_cuts_when_boundary_is_too_early() {
        let text = format!("ab {}", "c".repeat(50));
        let cut = truncate_content(&text, 20);
        assert_eq!(cut, format!("ab {}...", "c".repeat(14)));
        assert_eq!(char_len(&cut), 20);
    }

    #[test]
    fn hashtags_are_unique_and_ordered() {
        assert_eq!(
            extract_hashtags("#rust is #fun, #rust again #100DaysOfCode"),
            vec!["#rust", "#fun", "#100DaysOfCode"]
        );
        assert!(extract_hashtags("no tags").is_empty());
    }

    #[test]
    fn default_hashtags_only_added_when_they_fit() {
        let tags = ["#productivity", "#development"];
        assert_eq!(
            add_default_hashtags("Shipped it #development", &tags, 280),
            "Shipped it #development #productivity"
        );
        let long = "x".repeat(270);
        assert_eq!(add_default_hashtags(&long, &tags, 280), long);
        assert_eq!(
            add_default_hashtags("done #productivity #development", &tags, 280),
            "done #productivity #development"
        );
    }

    #[test]
    fn display_numbers_thread_pieces() {
        let thread = GeneratedContent::Thread(vec!["a".into(), "b".into()]);
        assert_eq!(format_content_for_display(&thread), "Tweet 1/2: a\n\nTweet 2/2: b");
        assert_eq!(
            format_content_for_display(&GeneratedContent::Single("solo".into())),
            "solo"
        );
    }
}
