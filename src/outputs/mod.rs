//! Output generation for the persisted record sets.
//!
//! # Submodules
//!
//! - [`json`]: Writes record lists as JSON arrays for the explorer and other tools
//! - [`report`]: Renders a wrapped plain-text report for reading
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── articles_all.json     # every record, including failed articles
//! ├── fraud_articles.json   # records at or above the similarity threshold
//! └── report.txt            # human-readable report of every record
//! ```

pub mod json;
pub mod report;
