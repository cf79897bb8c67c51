//! Plain-text report of a run, one block per record.
//!
//! ```text
//! ----
//! Title: Retailer discloses breach
//! URL: https://www.bleepingcomputer.com/news/security/retailer/
//! Author: Bill Toulas
//! Published: March 3, 2024
//! Similarity: 0.612
//! Summary:
//! Customer names and emails were exposed ...
//! ```

use crate::models::ArticleRecord;
use crate::utils::wrap_text;
use std::error::Error;
use std::fmt::Write;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const NONE: &str = "None";

/// Render every record as a block with its summary wrapped at `width`.
pub fn render_report(records: &[ArticleRecord], width: usize) -> String {
    let mut out = String::new();
    for record in records {
        writeln!(out, "----").unwrap();
        writeln!(out, "Title: {}", record.title.as_deref().unwrap_or(NONE)).unwrap();
        writeln!(out, "URL: {}", record.url).unwrap();
        writeln!(out, "Author: {}", record.author).unwrap();
        writeln!(out, "Published: {}", record.published).unwrap();
        if let Some(similarity) = record.similarity {
            writeln!(out, "Similarity: {similarity:.3}").unwrap();
        }
        if let Some(error) = &record.error {
            writeln!(out, "Error: {error}").unwrap();
        }
        writeln!(out, "Summary:").unwrap();
        let summary = record.summary.as_deref().unwrap_or(NONE);
        writeln!(out, "{}\n", wrap_text(summary, width)).unwrap();
    }
    out
}

/// Write the rendered report to `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = records.len()))]
pub async fn write_report(path: &Path, records: &[ArticleRecord], width: usize) -> Result<(), Box<dyn Error>> {
    fs::write(path, render_report(records, width)).await?;
    info!("Wrote text report");
    Ok(())
}
