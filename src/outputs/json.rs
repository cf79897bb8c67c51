//! JSON snapshots of a run's record sets.
//!
//! Each file is a pretty-printed array of records with the fields in the
//! order title, url, author, published, summary, similarity. Failed
//! articles additionally carry an `error` field. The explorer reads these
//! files back with [`read_records`].

use crate::models::ArticleRecord;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Write `records` to `path` as a JSON array, replacing any previous file.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = records.len()))]
pub async fn write_records(path: &Path, records: &[ArticleRecord]) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json).await?;
    info!("Wrote JSON records");
    Ok(())
}

/// Read a record array written by [`write_records`].
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_records(path: &Path) -> Result<Vec<ArticleRecord>, Box<dyn Error>> {
    let raw = fs::read_to_string(path).await?;
    let records: Vec<ArticleRecord> = serde_json::from_str(&raw)?;
    info!(count = records.len(), "Loaded JSON records");
    Ok(records)
}
