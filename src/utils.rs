//! Utility functions for text normalization, wrapping, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Whitespace collapsing and word counting for extracted text
//! - Greedy line wrapping for the plain-text report
//! - String truncation for log lines
//! - File system validation for output directories

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse every whitespace run into a single space and trim both ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_text("  March 3,\n 2024 "), "March 3, 2024");
/// ```
pub fn clean_text(txt: &str) -> String {
    WHITESPACE.replace_all(txt, " ").trim().to_string()
}

/// Number of whitespace-separated tokens in `txt`.
pub fn word_count(txt: &str) -> usize {
    txt.split_whitespace().count()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes (backing off to a character
/// boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Greedily wrap `text` into lines of at most `width` characters.
///
/// Whitespace is collapsed first. Words longer than `width` are placed on
/// their own line rather than split.
pub fn wrap_text(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  March 3,\n\t 2024 "), "March 3, 2024");
        assert_eq!(clean_text("   "), "");
        assert_eq!(clean_text("single"), "single");
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("Read more"), 2);
        assert_eq!(word_count("  Hackers   breach retailer "), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        let s = "ééééé";
        let result = truncate_for_log(s, 3);
        assert!(result.starts_with('é'));
        assert!(result.contains("(+8 bytes)"));
    }

    #[test]
    fn test_wrap_text_breaks_at_width() {
        let wrapped = wrap_text("one two three four five", 9);
        assert_eq!(wrapped, "one two\nthree\nfour five");
        for line in wrapped.lines() {
            assert!(line.chars().count() <= 9);
        }
    }

    #[test]
    fn test_wrap_text_keeps_long_words_whole() {
        assert_eq!(wrap_text("a supercalifragilistic b", 5), "a\nsupercalifragilistic\nb");
        assert_eq!(wrap_text("", 10), "");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested_path() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("out").join("run");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
