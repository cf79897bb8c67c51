//! # Breach Scout
//!
//! A batch pipeline that crawls a news site's data-breach tag, extracts
//! structured fields from every linked article, scores each article's
//! similarity to a fraud/breach concept, and persists the results.
//!
//! ## Features
//!
//! - Polite crawling: one shared HTTP identity, jittered delays, no retries
//! - Layout-tolerant extraction through ordered selector cascades per field
//! - Per-article failure isolation (failed pages become error rows)
//! - JSON snapshots, a plain-text report, and optional upserts into a
//!   PostgREST table store
//! - An `explore` command that filters and summarizes the persisted data
//!
//! ## Usage
//!
//! ```sh
//! breach_scout scrape --max-articles 20 -o ./output
//! breach_scout explore -i ./output --threshold 0.6
//! ```
//!
//! ## Architecture
//!
//! The scrape command follows a pipeline architecture:
//! 1. **Discovery**: Walk the tag listing and collect unique headline links
//! 2. **Extraction**: Fetch each article and read its fields through cascades
//! 3. **Scoring**: Compare each body to the fraud concept embedding
//! 4. **Assembly**: Sort, deduplicate by title, split at the threshold
//! 5. **Output**: Write JSON and report files, then upsert to the store

use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod diagnostics;
mod explore;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod scoring;
mod scrapers;
mod store;
#[cfg(test)]
mod testing;
mod utils;

use cli::{Cli, Command, ExploreArgs, ScrapeArgs};
use config::{AppConfig, OutputConfig};
use diagnostics::FileDumpSink;
use explore::ExploreFilters;
use fetcher::HttpFetcher;
use outputs::{json, report};
use pipeline::Pipeline;
use scoring::{ConfiguredEmbedder, Scorer};
use scrapers::article::ArticleExtractor;
use scrapers::listing::LinkDiscoverer;
use store::{RecordStore, RestTableStore};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    match args.command {
        Command::Scrape(args) => scrape(args).await,
        Command::Explore(args) => explore_snapshots(args).await,
    }
}

#[instrument(level = "info", skip_all)]
async fn scrape(args: ScrapeArgs) -> Result<(), Box<dyn Error>> {
    let start_time = Instant::now();
    info!(
        max_articles = args.max_articles,
        max_pages = args.max_pages,
        threshold = args.threshold,
        "breach_scout starting up"
    );

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }

    // Output path must be usable before any crawling starts
    if let Err(e) = ensure_writable_dir(&config.output.dir).await {
        error!(
            path = %config.output.dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let fetcher = HttpFetcher::new(&config.fetch)?;
    let discoverer = LinkDiscoverer::new(&config.site)?;
    let extractor = ArticleExtractor::from_config(&config.extraction)?;
    let embedder = ConfiguredEmbedder::from_config(&config.scoring, args.openai_api_key.as_deref())?;
    let scorer = Scorer::new(embedder, &config.scoring.concept).await?;
    let sink = FileDumpSink::new(config.extraction.debug_dump_path.clone());
    info!(listing_url = %config.site.listing_url, provider = ?config.scoring.provider, "Components ready");

    let output = Pipeline {
        source: &fetcher,
        discoverer: &discoverer,
        extractor: &extractor,
        scorer: &scorer,
        diagnostics: &sink,
    }
    .run(args.max_articles, args.max_pages, args.threshold)
    .await?;

    // ---- File outputs ----
    let dir = &config.output.dir;
    let all_path = dir.join(&config.output.all_file);
    if let Err(e) = json::write_records(&all_path, &output.all_records).await {
        error!(path = %all_path.display(), error = %e, "Failed to write all-articles JSON");
    }
    let filtered_path = dir.join(&config.output.filtered_file);
    if let Err(e) = json::write_records(&filtered_path, &output.filtered_records).await {
        error!(path = %filtered_path.display(), error = %e, "Failed to write filtered JSON");
    }
    let report_path = dir.join(&config.output.report_file);
    if let Err(e) = report::write_report(&report_path, &output.all_records, config.output.report_width).await {
        error!(path = %report_path.display(), error = %e, "Failed to write text report");
    }

    // ---- Remote store ----
    match RestTableStore::from_settings(
        args.store_url.as_deref(),
        args.store_key.as_deref(),
        Duration::from_secs(config.store.timeout_secs),
    ) {
        Ok(Some(store)) => {
            for (table, records) in [
                (&config.store.table_all, &output.all_records),
                (&config.store.table_filtered, &output.filtered_records),
            ] {
                if let Err(e) = store.upsert(table, records, &config.store.conflict_key).await {
                    error!(%table, error = %e, "Store upsert failed; files on disk remain authoritative");
                }
            }
        }
        Ok(None) => warn!("Store URL or key missing; skipping remote upsert"),
        Err(e) => error!(error = %e, "Could not build store client; skipping remote upsert"),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        articles = output.all_records.len(),
        fraud_like = output.filtered_records.len(),
        "Execution complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn explore_snapshots(args: ExploreArgs) -> Result<(), Box<dyn Error>> {
    let output = AppConfig::load(args.config.as_deref())?.output;
    let (all_path, filtered_path) = snapshot_paths(&output, args.input_dir.as_deref());
    info!(all = %all_path.display(), filtered = %filtered_path.display(), "Reading snapshots");
    let all = json::read_records(&all_path).await?;
    let fraud = json::read_records(&filtered_path).await?;

    let filters = ExploreFilters {
        threshold: args.threshold,
        keywords: args.keywords,
        since: args.since,
        until: args.until,
    };
    let exploration = explore::explore(&all, &fraud, &filters);
    info!(
        total = exploration.total_scraped,
        matches = exploration.matches.len(),
        "Applied explorer filters"
    );
    let markdown = explore::render_markdown(&exploration, args.inspect.as_deref());

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, markdown).await?;
            info!(path = %path.display(), "Wrote explorer Markdown");
        }
        None => println!("{markdown}"),
    }
    Ok(())
}

/// Locations of the two JSON snapshots a scrape with `output` wrote.
fn snapshot_paths(output: &OutputConfig, input_dir: Option<&Path>) -> (PathBuf, PathBuf) {
    let dir = input_dir.unwrap_or(output.dir.as_path());
    (dir.join(&output.all_file), dir.join(&output.filtered_file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_paths_follow_configured_names() {
        let output = OutputConfig {
            all_file: "everything.json".to_string(),
            filtered_file: "suspicious.json".to_string(),
            ..OutputConfig::default()
        };
        assert_eq!(
            snapshot_paths(&output, None),
            (PathBuf::from("output/everything.json"), PathBuf::from("output/suspicious.json"))
        );
        assert_eq!(
            snapshot_paths(&output, Some(Path::new("/srv/runs"))).0,
            PathBuf::from("/srv/runs/everything.json")
        );
    }
}
