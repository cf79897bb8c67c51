//! Rate-limited page fetching with a fixed browser identity.
//!
//! Every request of a run goes through one [`HttpFetcher`]: a single
//! `reqwest::Client` (one connection pool, one header set) that sleeps a
//! random, jittered delay before each GET. Listing pages get a longer delay
//! than article pages. Nothing is retried; a failed request is a terminal
//! [`FetchError`] for whatever unit of work asked for it.
//!
//! Components depend on the [`PageSource`] trait rather than on the HTTP
//! client so tests can replay canned pages.

use crate::config::{ConfigError, DelayRange, FetchConfig};
use rand::{Rng, rng};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Why a page could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// The kind of page being requested; selects the politeness delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Listing,
    Article,
}

/// Anything that can turn a URL into page markup.
pub trait PageSource {
    /// Fetch `url` and return its body text.
    async fn fetch(&self, url: &str, kind: PageKind) -> Result<String, FetchError>;
}

/// Build the URL of listing page `page` (1-based).
///
/// Page 1 is the bare listing URL; later pages append `/page/N/`.
pub fn listing_page_url(listing_url: &str, page: usize) -> String {
    if page <= 1 {
        listing_url.to_string()
    } else {
        format!("{}/page/{}/", listing_url.trim_end_matches('/'), page)
    }
}

/// Pick a uniformly random delay inside `range`.
pub fn jitter(range: DelayRange) -> Duration {
    let ms = rng().random_range(range.min_ms..=range.max_ms);
    Duration::from_millis(ms)
}

/// HTTP implementation of [`PageSource`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    listing_delay: DelayRange,
    article_delay: DelayRange,
}

impl HttpFetcher {
    /// Create the shared client with the configured identity headers and timeout.
    pub fn new(config: &FetchConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .default_headers(config.identity_headers()?)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            listing_delay: config.listing_delay_ms,
            article_delay: config.article_delay_ms,
        })
    }

    fn delay_for(&self, kind: PageKind) -> DelayRange {
        match kind {
            PageKind::Listing => self.listing_delay,
            PageKind::Article => self.article_delay,
        }
    }
}

impl PageSource for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str, kind: PageKind) -> Result<String, FetchError> {
        let delay = jitter(self.delay_for(kind));
        debug!(?delay, "Sleeping before request");
        sleep(delay).await;

        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e));

        match &body {
            Ok(text) => debug!(
                bytes = text.len(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Fetched page"
            ),
            Err(e) => warn!(error = %e, "Failed reading response body"),
        }
        body
    }
}
