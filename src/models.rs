//! Data models for discovered links and extracted article records.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ArticleLink`]: A headline link found on a listing page
//! - [`ArticleRecord`]: The extracted (and later scored) fields of one article
//! - [`RunOutput`]: The full and threshold-filtered record sets of a run
//!
//! Records are assembled once and never mutated afterwards; a re-scrape
//! produces a new record that the remote store reconciles by URL.

use serde::{Deserialize, Serialize};

/// Placeholder used when no extraction strategy finds an author or date.
pub const UNKNOWN: &str = "unknown";

/// Placeholder written into author/published when the article itself failed.
pub const ERROR_MARKER: &str = "error";

/// A headline link discovered on a listing page.
///
/// Unique by `url` within one discovery run. The `title` is the visible
/// anchor text and always has at least three words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleLink {
    /// The anchor text, whitespace-collapsed.
    pub title: String,
    /// Absolute article URL without fragment.
    pub url: String,
}

/// One article as it leaves the pipeline.
///
/// Field order matters: it is the column order of the persisted files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// First `<h1>` text, or the anchor text for failed articles.
    pub title: Option<String>,
    /// The article URL, always carried from the discovered link.
    pub url: String,
    /// Author name, [`UNKNOWN`] or [`ERROR_MARKER`].
    pub author: String,
    /// Publish date text, [`UNKNOWN`] or [`ERROR_MARKER`].
    pub published: String,
    /// Extractive summary of the first paragraphs.
    pub summary: Option<String>,
    /// Similarity to the fraud concept in `[0.0, 1.0]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    /// Why the article could not be fetched or parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArticleRecord {
    /// Build the stand-in record for an article whose fetch or parse failed.
    pub fn failed(link: &ArticleLink, error: impl Into<String>) -> Self {
        Self {
            title: Some(link.title.clone()),
            url: link.url.clone(),
            author: ERROR_MARKER.to_string(),
            published: ERROR_MARKER.to_string(),
            summary: None,
            similarity: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Return a copy carrying the given similarity score.
    pub fn with_similarity(self, similarity: Option<f64>) -> Self {
        Self { similarity, ..self }
    }

    /// Key used for title-level deduplication. Falls back to the URL when
    /// the page had no headline so untitled records never collapse together.
    pub fn dedup_key(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}

/// The two record sets a pipeline run hands to outputs and the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutput {
    /// Every assembled record (including failures), sorted by similarity
    /// descending and deduplicated by title.
    pub all_records: Vec<ArticleRecord>,
    /// The subset of `all_records` at or above the similarity threshold.
    pub filtered_records: Vec<ArticleRecord>,
}
