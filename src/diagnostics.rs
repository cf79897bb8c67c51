//! Diagnostic side channel for pages no extraction cascade understood.
//!
//! When author, date and body all come back empty the site has most likely
//! shipped a layout the selectors have never seen. The pipeline hands such
//! pages to a [`DiagnosticSink`]; the default [`FileDumpSink`] overwrites a
//! single debug file so the newest offender is always the one on disk.

use std::path::PathBuf;
use tokio::fs;
use tracing::{error, warn};

/// Receives the raw markup of pages with an unrecognized layout.
pub trait DiagnosticSink {
    async fn unrecognized_layout(&self, url: &str, html: &str);
}

/// Writes the offending page to a fixed path.
#[derive(Debug, Clone)]
pub struct FileDumpSink {
    path: PathBuf,
}

impl FileDumpSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DiagnosticSink for FileDumpSink {
    async fn unrecognized_layout(&self, url: &str, html: &str) {
        match fs::write(&self.path, html).await {
            Ok(()) => warn!(
                %url,
                path = %self.path.display(),
                "Layout was unexpected; wrote page for inspection"
            ),
            Err(e) => error!(
                %url,
                path = %self.path.display(),
                error = %e,
                "Layout was unexpected and the debug dump failed"
            ),
        }
    }
}
