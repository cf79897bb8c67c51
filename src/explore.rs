//! Filter and summarize persisted snapshots without re-scraping.
//!
//! The explorer loads `articles_all.json` and `fraud_articles.json`, applies
//! a similarity threshold and a publish-date window to the fraud set, and
//! renders Markdown with:
//! - overview counts (scraped, matching, share of total)
//! - matching articles per month
//! - mentions of selected lexicon keywords per month
//! - an article table, newest first, and optionally one article in full

use crate::models::ArticleRecord;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Terms whose monthly mention counts the explorer can chart.
pub const FRAUD_LEXICON: [&str; 10] = [
    "breach",
    "exposed",
    "credential",
    "ransomware",
    "phishing",
    "data leak",
    "identity theft",
    "extortion",
    "malware",
    "exfiltration",
];

pub const DEFAULT_KEYWORDS: [&str; 3] = ["breach", "ransomware", "credential"];

pub const DEFAULT_THRESHOLD: f64 = 0.55;

/// Parse the free-form publish text scraped from article pages.
///
/// Accepts `March 3, 2024`, `Mar 3, 2024 02:15 PM` (anything after the date
/// is ignored) and ISO `2024-03-03`.
pub fn parse_published(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    ["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_and_remainder(text, fmt).ok().map(|(date, _)| date))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// User-selected filters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExploreFilters {
    pub threshold: f64,
    pub keywords: Vec<String>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

impl Default for ExploreFilters {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            since: None,
            until: None,
        }
    }
}

/// A fraud record with its parsed publish date.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedRecord {
    pub date: NaiveDate,
    pub record: ArticleRecord,
}

/// Everything the rendered view shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Exploration {
    pub total_scraped: usize,
    pub window: Option<(NaiveDate, NaiveDate)>,
    pub threshold: f64,
    /// Matching records, newest first.
    pub matches: Vec<DatedRecord>,
    pub monthly_counts: BTreeMap<NaiveDate, usize>,
    pub keywords: Vec<String>,
    pub keyword_trend: BTreeMap<NaiveDate, BTreeMap<String, usize>>,
}

impl Exploration {
    pub fn share_percent(&self) -> f64 {
        self.matches.len() as f64 / self.total_scraped.max(1) as f64 * 100.0
    }
}

/// Apply `filters` to the fraud snapshot and compute every aggregate.
pub fn explore(all: &[ArticleRecord], fraud: &[ArticleRecord], filters: &ExploreFilters) -> Exploration {
    let dated: Vec<DatedRecord> = fraud
        .iter()
        .filter_map(|record| {
            parse_published(&record.published).map(|date| DatedRecord {
                date,
                record: record.clone(),
            })
        })
        .collect();

    let min = dated.iter().map(|d| d.date).min();
    let max = dated.iter().map(|d| d.date).max();
    let window = match (filters.since.or(min), filters.until.or(max)) {
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    };

    let mut matches: Vec<DatedRecord> = match window {
        Some((start, end)) => dated
            .into_iter()
            .filter(|d| d.record.similarity.is_some_and(|s| s >= filters.threshold))
            .filter(|d| d.date >= start && d.date <= end)
            .collect(),
        None => Vec::new(),
    };
    matches.sort_by(|a, b| b.date.cmp(&a.date));

    let mut monthly_counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut monthly_text: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    for m in &matches {
        let month = month_start(m.date);
        *monthly_counts.entry(month).or_default() += 1;
        monthly_text
            .entry(month)
            .or_default()
            .push(m.record.summary.as_deref().unwrap_or_default().to_lowercase());
    }

    let keyword_trend = monthly_text
        .into_iter()
        .map(|(month, summaries)| {
            let text = summaries.join(" ");
            let counts = filters
                .keywords
                .iter()
                .map(|kw| (kw.clone(), text.matches(kw.as_str()).count()))
                .collect();
            (month, counts)
        })
        .collect();

    Exploration {
        total_scraped: all.len(),
        window,
        threshold: filters.threshold,
        matches,
        monthly_counts,
        keywords: filters.keywords.clone(),
        keyword_trend,
    }
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Render the exploration as Markdown. `inspect` selects one matching
/// article by exact title to show in full.
pub fn render_markdown(exploration: &Exploration, inspect: Option<&str>) -> String {
    let mut md = String::new();
    writeln!(md, "# Fraud & Data Breach News Explorer\n").unwrap();

    writeln!(md, "## Overview\n").unwrap();
    writeln!(md, "| Total articles scraped | Fraud-like articles (filtered) | Fraud-like % of total |").unwrap();
    writeln!(md, "|---|---|---|").unwrap();
    writeln!(
        md,
        "| {} | {} | {:.1}% |\n",
        exploration.total_scraped,
        exploration.matches.len(),
        exploration.share_percent()
    )
    .unwrap();
    match exploration.window {
        Some((start, end)) => writeln!(
            md,
            "Similarity threshold {:.2}, published {start} to {end}.\n",
            exploration.threshold
        )
        .unwrap(),
        None => writeln!(md, "Similarity threshold {:.2}, no dated articles.\n", exploration.threshold).unwrap(),
    }

    writeln!(md, "## Monthly Fraud Article Count\n").unwrap();
    if exploration.matches.is_empty() {
        writeln!(md, "_No articles match the current filters._\n").unwrap();
    } else {
        writeln!(md, "| Month | Articles |\n|---|---|").unwrap();
        for (month, count) in &exploration.monthly_counts {
            writeln!(md, "| {} | {count} |", month.format("%Y-%m")).unwrap();
        }
        writeln!(md).unwrap();
    }

    writeln!(md, "## Keyword Mentions Over Time\n").unwrap();
    if exploration.matches.is_empty() || exploration.keywords.is_empty() {
        writeln!(md, "_Not enough data to plot keyword trends with current filters._\n").unwrap();
    } else {
        writeln!(md, "| Month | {} |", exploration.keywords.join(" | ")).unwrap();
        writeln!(md, "|---|{}", "---|".repeat(exploration.keywords.len())).unwrap();
        for (month, counts) in &exploration.keyword_trend {
            let cells: Vec<String> = exploration
                .keywords
                .iter()
                .map(|kw| counts.get(kw).copied().unwrap_or(0).to_string())
                .collect();
            writeln!(md, "| {} | {} |", month.format("%Y-%m"), cells.join(" | ")).unwrap();
        }
        writeln!(md).unwrap();
    }

    writeln!(md, "## Article Explorer\n").unwrap();
    writeln!(md, "| Published | Similarity | Title | URL |\n|---|---|---|---|").unwrap();
    for m in &exploration.matches {
        writeln!(
            md,
            "| {} | {:.3} | {} | {} |",
            m.date,
            m.record.similarity.unwrap_or_default(),
            cell(m.record.title.as_deref().unwrap_or("")),
            m.record.url
        )
        .unwrap();
    }

    if let Some(title) = inspect {
        writeln!(md).unwrap();
        match exploration
            .matches
            .iter()
            .find(|m| m.record.title.as_deref() == Some(title))
        {
            Some(m) => {
                writeln!(md, "## Selected Article\n").unwrap();
                writeln!(md, "**Title:** {}\n", m.record.title.as_deref().unwrap_or("")).unwrap();
                writeln!(md, "**Published:** {}\n", m.date).unwrap();
                writeln!(md, "**Similarity:** {:.3}\n", m.record.similarity.unwrap_or_default()).unwrap();
                writeln!(md, "[Open article]({})\n", m.record.url).unwrap();
                writeln!(md, "**Summary:**\n\n{}", m.record.summary.as_deref().unwrap_or("None")).unwrap();
            }
            None => writeln!(md, "_No matching article titled \"{title}\"._").unwrap(),
        }
    }
    md
}
