//! Command-line interface definitions for Breach Scout.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets (store URL and key, embedding API key) can also be provided via
//! environment variables.

use crate::explore::{DEFAULT_KEYWORDS, DEFAULT_THRESHOLD, FRAUD_LEXICON};
use chrono::NaiveDate;
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Breach Scout application.
///
/// # Examples
///
/// ```sh
/// # Crawl two listing pages and keep the 30 newest articles
/// breach_scout scrape --max-articles 30 --max-pages 2 -o ./output
///
/// # Upsert into the remote table as well
/// SUPABASE_URL=https://x.supabase.co SUPABASE_KEY=... breach_scout scrape
///
/// # Explore the persisted snapshots
/// breach_scout explore -i ./output --threshold 0.6 --keyword phishing
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl the tag listing, extract and score articles, and persist them
    Scrape(ScrapeArgs),
    /// Filter and summarize previously persisted results
    Explore(ExploreArgs),
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Optional path to a YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum number of articles to scrape
    #[arg(long, default_value_t = 20)]
    pub max_articles: usize,

    /// Maximum number of listing pages to crawl
    #[arg(long, default_value_t = 5)]
    pub max_pages: usize,

    /// Minimum similarity for an article to count as fraud-like
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Output directory for JSON and report files (overrides the config file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Base URL of the remote table store
    #[arg(long, env = "SUPABASE_URL")]
    pub store_url: Option<String>,

    /// API key of the remote table store
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub store_key: Option<String>,

    /// API key for the OpenAI embeddings provider
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExploreArgs {
    /// YAML configuration used for the scrape; supplies the output file names
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the JSON snapshots (overrides the config file)
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Minimum similarity to show
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Keyword to chart (repeatable)
    #[arg(long = "keyword", value_parser = PossibleValuesParser::new(FRAUD_LEXICON), default_values_t = DEFAULT_KEYWORDS.map(String::from))]
    pub keywords: Vec<String>,

    /// Earliest publish date to include (YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<NaiveDate>,

    /// Latest publish date to include (YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<NaiveDate>,

    /// Title of one article to show in full
    #[arg(long)]
    pub inspect: Option<String>,

    /// Write the Markdown here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}
