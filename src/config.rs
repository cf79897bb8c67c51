//! Runtime configuration for the crawl, extraction, scoring, store and outputs.
//!
//! Everything that used to be a hard-coded constant of the scraper (the
//! target site, request headers, politeness delays, selector cascades, the
//! fraud concept phrase) lives in one [`AppConfig`] built at start-up and
//! handed to each component. Defaults target the BleepingComputer
//! `data-breach` tag; a YAML file can override any subset of keys:
//!
//! ```yaml
//! site:
//!   listing_url: https://www.bleepingcomputer.com/tag/ransomware/
//! fetch:
//!   listing_delay_ms: { min_ms: 2000, max_ms: 4000 }
//! scoring:
//!   provider: openai
//! ```

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid CSS selector `{selector}`: {message}")]
    Selector { selector: String, message: String },
    #[error("invalid URL `{url}`: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid value for header {name}: {value:?}")]
    Header { name: &'static str, value: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("{0}")]
    Invalid(String),
}

/// Top-level configuration object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub fetch: FetchConfig,
    pub extraction: ExtractionConfig,
    pub scoring: ScoringConfig,
    pub store: StoreConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from an optional YAML file, falling back to the
    /// defaults for every key the file leaves out.
    #[instrument(level = "info", skip_all, fields(path = ?path))]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                let parsed: AppConfig = serde_yaml::from_str(&raw)?;
                info!("Loaded configuration file");
                parsed
            }
            None => AppConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for url in [&self.site.base_url, &self.site.listing_url] {
            url::Url::parse(url).map_err(|source| ConfigError::Url {
                url: url.clone(),
                source,
            })?;
        }
        self.fetch.identity_headers()?;
        self.fetch.listing_delay_ms.validate("fetch.listing_delay_ms")?;
        self.fetch.article_delay_ms.validate("fetch.article_delay_ms")?;
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch.timeout_secs must be positive".into()));
        }
        if self.site.article_path.trim().is_empty() {
            return Err(ConfigError::Invalid("site.article_path must not be empty".into()));
        }
        if self.scoring.concept.trim().is_empty() {
            return Err(ConfigError::Invalid("scoring.concept must not be empty".into()));
        }
        if self.scoring.dimensions == 0 {
            return Err(ConfigError::Invalid("scoring.dimensions must be positive".into()));
        }
        if self.output.report_width < 20 {
            return Err(ConfigError::Invalid("output.report_width must be at least 20".into()));
        }
        Ok(())
    }
}

/// The crawled site and the link filters applied to its listing pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Origin used to resolve relative links and to reject foreign hosts.
    pub base_url: String,
    /// First listing page; later pages append `/page/N/`.
    pub listing_url: String,
    /// Path substring every article URL contains.
    pub article_path: String,
    /// Lower-case path fragments marking promotional pages.
    pub excluded_markers: Vec<String>,
    /// Minimum words of anchor text for a link to count as a headline.
    pub min_title_words: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.bleepingcomputer.com".to_string(),
            listing_url: "https://www.bleepingcomputer.com/tag/data-breach/".to_string(),
            article_path: "/news/security/".to_string(),
            excluded_markers: vec!["webinar".to_string()],
            min_title_words: 3,
        }
    }
}

/// Inclusive range of milliseconds to sleep before a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::Invalid(format!(
                "{name}: min_ms ({}) is greater than max_ms ({})",
                self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }
}

/// Request identity and politeness settings shared by every fetch of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub timeout_secs: u64,
    pub listing_delay_ms: DelayRange,
    pub article_delay_ms: DelayRange,
}

impl FetchConfig {
    /// The header set sent with every request. A value that is not a legal
    /// header value is an error, never silently left out.
    pub fn identity_headers(&self) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::new();
        for (header, name, value) in [
            (USER_AGENT, "User-Agent", &self.user_agent),
            (ACCEPT, "Accept", &self.accept),
            (ACCEPT_LANGUAGE, "Accept-Language", &self.accept_language),
        ] {
            let parsed = HeaderValue::from_str(value).map_err(|_| ConfigError::Header {
                name,
                value: value.clone(),
            })?;
            headers.insert(header, parsed);
        }
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        Ok(headers)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                         AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/121.0.0.0 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;\
                     q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8"
                .to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            timeout_secs: 10,
            listing_delay_ms: DelayRange::new(5_000, 9_000),
            article_delay_ms: DelayRange::new(800, 1_600),
        }
    }
}

/// Selector cascades for each extracted field, tried in order.
///
/// Each entry is a CSS selector group; the first one yielding non-empty
/// text wins. Author strategies run in the order: dedicated class, generic
/// author classes, rel-author link wrapping a name element, microdata name,
/// then a "By Name" scan of the byline region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub title_selectors: Vec<String>,
    pub date_selectors: Vec<String>,
    pub author_selectors: Vec<String>,
    pub author_link_selector: String,
    pub author_name_selector: String,
    pub microdata_name_selectors: Vec<String>,
    pub generic_author_selectors: Vec<String>,
    pub byline_region_selectors: Vec<String>,
    /// Paragraph selector inside the current article container.
    pub body_selector: String,
    /// Paragraph selectors for older layouts, tried when the primary one
    /// yields no usable paragraph.
    pub fallback_body_selectors: Vec<String>,
    pub min_paragraph_words: usize,
    /// Lower-case prefixes of paragraphs that are cross-link spam.
    pub skip_paragraph_prefixes: Vec<String>,
    pub summary_paragraphs: usize,
    pub summary_sentences: usize,
    pub truncate_chars: usize,
    /// Where the page is dumped when no author, date or body was found.
    pub debug_dump_path: PathBuf,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            title_selectors: vec!["h1".to_string()],
            date_selectors: vec![
                ".bc_article_date".to_string(),
                "time".to_string(),
                ".date, .post_date, span.date, div.date".to_string(),
            ],
            author_selectors: vec![".bc_article_author".to_string()],
            author_link_selector: "a[rel='author']".to_string(),
            author_name_selector: "[itemprop='name']".to_string(),
            microdata_name_selectors: vec!["[itemprop='name']".to_string()],
            generic_author_selectors: vec![
                "span.author, div.author, .article_author, .post_author".to_string(),
            ],
            byline_region_selectors: vec![
                ".bc_article_top, .bc_article_header, header, .article_header".to_string(),
            ],
            body_selector: "div#bc_article_content p".to_string(),
            fallback_body_selectors: vec![
                "div[id^='bc_article_content'] p".to_string(),
                "article p".to_string(),
            ],
            min_paragraph_words: 4,
            skip_paragraph_prefixes: vec!["related:".to_string()],
            summary_paragraphs: 6,
            summary_sentences: 3,
            truncate_chars: 400,
            debug_dump_path: PathBuf::from("debug_article.html"),
        }
    }
}

/// Which embedding backend scores the articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Offline hashed term-frequency vectors.
    #[default]
    Lexical,
    /// An OpenAI-compatible `/embeddings` endpoint.
    OpenAi,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub provider: EmbeddingProvider,
    /// Phrase describing the fraud/breach concept articles are compared to.
    pub concept: String,
    pub model: String,
    pub base_url: String,
    /// Vector length for the lexical embedder.
    pub dimensions: usize,
    pub timeout_secs: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Lexical,
            concept: "fraud data breach stolen credentials leaked personal information \
                      identity theft ransomware extortion phishing exposed customer records"
                .to_string(),
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            dimensions: 1024,
            timeout_secs: 30,
        }
    }
}

/// Remote table names; credentials come from the CLI or environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub table_all: String,
    pub table_filtered: String,
    pub conflict_key: String,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_all: "articles_all".to_string(),
            table_filtered: "fraud_articles".to_string(),
            conflict_key: "url".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub all_file: String,
    pub filtered_file: String,
    pub report_file: String,
    pub report_width: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            all_file: "articles_all.json".to_string(),
            filtered_file: "fraud_articles.json".to_string(),
            report_file: "report.txt".to_string(),
            report_width: 100,
        }
    }
}
