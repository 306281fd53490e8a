//! Utility functions and helpers.

pub mod fs;
pub mod http;
pub mod time;

use std::time::Duration;

use unicode_segmentation::UnicodeSegmentation;

/// Sleep for `ms` milliseconds; zero skips the await entirely.
pub async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Cut text to at most `max_chars` user-perceived characters (0 = no limit).
pub fn truncate_graphemes(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return text;
    }
    match text.grapheme_indices(true).nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_graphemes() {
        assert_eq!(truncate_graphemes("房貸利率很高", 4), "房貸利率");
        assert_eq!(truncate_graphemes("short", 100), "short");
        assert_eq!(truncate_graphemes("unlimited", 0), "unlimited");
        // family emoji is a single grapheme
        assert_eq!(truncate_graphemes("👨‍👩‍👧ab", 1), "👨‍👩‍👧");
    }
}
