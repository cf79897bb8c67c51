//! The batch driver: discover links, extract each article, score, assemble.
//!
//! # Failure isolation
//!
//! A failed listing fetch aborts the run (there is nothing to scrape). A
//! failed article fetch only costs that article: it becomes an error record
//! carrying the link's title and URL and the batch moves on. Nothing is
//! retried within a run.
//!
//! # Assembly
//!
//! Records are sorted by similarity (highest first, unscored last) and then
//! deduplicated by title, so when one story is syndicated under several URLs
//! the best-scoring copy is the one kept. Two distinct stories sharing a
//! headline would also collapse into one; that is accepted.

use crate::diagnostics::DiagnosticSink;
use crate::fetcher::{FetchError, PageKind, PageSource};
use crate::models::{ArticleLink, ArticleRecord, RunOutput};
use crate::scoring::{Embedder, Scorer};
use crate::scrapers::article::ArticleExtractor;
use crate::scrapers::listing::LinkDiscoverer;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

/// Borrowed components of one run.
pub struct Pipeline<'a, S, E, D> {
    pub source: &'a S,
    pub discoverer: &'a LinkDiscoverer,
    pub extractor: &'a ArticleExtractor,
    pub scorer: &'a Scorer<E>,
    pub diagnostics: &'a D,
}

impl<S, E, D> Pipeline<'_, S, E, D>
where
    S: PageSource,
    E: Embedder,
    D: DiagnosticSink,
{
    /// Run the whole batch and split the result at `similarity_threshold`.
    ///
    /// # Errors
    ///
    /// Only a listing-page [`FetchError`] escapes; article failures are
    /// folded into the returned records.
    #[instrument(level = "info", skip(self))]
    pub async fn run(
        &self,
        max_articles: usize,
        max_pages: usize,
        similarity_threshold: f64,
    ) -> Result<RunOutput, FetchError> {
        let links = self
            .discoverer
            .discover(self.source, max_articles, max_pages)
            .await?;
        let total = links.len();
        info!(total, "Scraping discovered articles");

        let records: Vec<ArticleRecord> = stream::iter(links.into_iter().enumerate())
            .then(|(index, link)| async move {
                let record = self.process(&link).await;
                debug!(index, total, url = %link.url, failed = record.is_error(), "Processed article");
                record
            })
            .collect()
            .await;

        let failed = records.iter().filter(|r| r.is_error()).count();
        let output = assemble(records, similarity_threshold);
        info!(
            scraped = total,
            failed,
            kept = output.all_records.len(),
            above_threshold = output.filtered_records.len(),
            "Assembled results"
        );
        Ok(output)
    }

    /// Fetch, extract and score one article. Never fails.
    async fn process(&self, link: &ArticleLink) -> ArticleRecord {
        let html = match self.source.fetch(&link.url, PageKind::Article).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %link.url, error = %e, "Article fetch failed; recording error row");
                return ArticleRecord::failed(link, e.to_string());
            }
        };

        let extraction = self.extractor.extract(&html, &link.url);
        if extraction.layout_unrecognized() {
            self.diagnostics.unrecognized_layout(&link.url, &html).await;
        }

        let similarity = match self.scorer.score(&extraction.body).await {
            Ok(score) => Some(score),
            Err(e) => {
                warn!(url = %link.url, error = %e, "Scoring failed; leaving similarity unset");
                None
            }
        };
        extraction.record.with_similarity(similarity)
    }
}

fn rank(record: &ArticleRecord) -> f64 {
    record.similarity.unwrap_or(f64::NEG_INFINITY)
}

/// Sort by similarity descending, keep the first record per title, and
/// select the scored records at or above `threshold`.
pub fn assemble(mut records: Vec<ArticleRecord>, threshold: f64) -> RunOutput {
    records.sort_by(|a, b| rank(b).total_cmp(&rank(a)));
    let all_records: Vec<ArticleRecord> = records
        .into_iter()
        .unique_by(|r| r.dedup_key().to_string())
        .collect();
    let filtered_records = all_records
        .iter()
        .filter(|r| !r.is_error() && r.similarity.is_some_and(|s| s >= threshold))
        .cloned()
        .collect();
    RunOutput {
        all_records,
        filtered_records,
    }
}
