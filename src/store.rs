//! Upsert of assembled records into a remote table store.
//!
//! The store is a PostgREST endpoint (a hosted Supabase table in practice)
//! with a unique constraint on `url`. Writes are best effort: the JSON files
//! on disk are the source of truth, so callers log a [`StoreError`] and
//! carry on, and a missing URL or key turns the write into a no-op.

use crate::models::ArticleRecord;
use crate::utils::truncate_for_log;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store rejected upsert into {table} ({status}): {body}")]
    Rejected {
        table: String,
        status: u16,
        body: String,
    },
    #[error("invalid store credentials: {0}")]
    Credentials(String),
}

/// Anything that can upsert records keyed by a unique column.
pub trait RecordStore {
    /// Insert or update `records` in `table`, resolving conflicts on
    /// `conflict_key`. Returns the number of rows sent.
    async fn upsert(
        &self,
        table: &str,
        records: &[ArticleRecord],
        conflict_key: &str,
    ) -> Result<usize, StoreError>;
}

/// The row shape of the remote table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreRow<'a> {
    pub title: Option<&'a str>,
    pub url: &'a str,
    pub author: &'a str,
    pub published: &'a str,
    pub summary: Option<&'a str>,
    pub similarity: Option<f64>,
}

impl<'a> From<&'a ArticleRecord> for StoreRow<'a> {
    fn from(record: &'a ArticleRecord) -> Self {
        Self {
            title: record.title.as_deref(),
            url: &record.url,
            author: &record.author,
            published: &record.published,
            summary: record.summary.as_deref(),
            similarity: record.similarity.filter(|s| s.is_finite()),
        }
    }
}

/// PostgREST client issuing merge-duplicates upserts.
#[derive(Debug, Clone)]
pub struct RestTableStore {
    client: reqwest::Client,
    base_url: String,
}

impl RestTableStore {
    /// Build a store from optional settings; `Ok(None)` when either the URL
    /// or the key is missing or blank.
    pub fn from_settings(
        url: Option<&str>,
        key: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<Self>, StoreError> {
        let (Some(url), Some(key)) = (url, key) else {
            return Ok(None);
        };
        if url.trim().is_empty() || key.trim().is_empty() {
            return Ok(None);
        }
        Self::new(url, key, timeout).map(Some)
    }

    pub fn new(url: &str, key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = key.trim();
        headers.insert(
            "apikey",
            HeaderValue::from_str(key).map_err(|e| StoreError::Credentials(e.to_string()))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| StoreError::Credentials(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=minimal"),
        );
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: url.trim().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, table: &str, conflict_key: &str) -> String {
        format!(
            "{}/rest/v1/{}?on_conflict={}",
            self.base_url,
            urlencoding::encode(table),
            urlencoding::encode(conflict_key)
        )
    }
}

impl RecordStore for RestTableStore {
    #[instrument(level = "info", skip(self, records), fields(count = records.len()))]
    async fn upsert(
        &self,
        table: &str,
        records: &[ArticleRecord],
        conflict_key: &str,
    ) -> Result<usize, StoreError> {
        if records.is_empty() {
            info!("No records to upsert");
            return Ok(0);
        }
        let rows: Vec<StoreRow<'_>> = records.iter().map(StoreRow::from).collect();
        let response = self
            .client
            .post(self.endpoint(table, conflict_key))
            .json(&rows)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                table: table.to_string(),
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }
        info!(rows = rows.len(), "Upserted records");
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::thread;

    fn record(similarity: Option<f64>) -> ArticleRecord {
        ArticleRecord {
            title: Some("Retailer breach".to_string()),
            url: "https://example.com/news/security/retailer/".to_string(),
            author: "unknown".to_string(),
            published: "March 3, 2024".to_string(),
            summary: None,
            similarity,
            error: None,
        }
    }

    #[test]
    fn test_row_normalises_non_finite_similarity() {
        let nan = record(Some(f64::NAN));
        let row = StoreRow::from(&nan);
        assert_eq!(row.similarity, None);
        let json = serde_json::to_value(&row).unwrap();
        assert!(json["similarity"].is_null());
        assert!(json["summary"].is_null());
        assert!(json.get("error").is_none());

        let scored = record(Some(0.7));
        assert_eq!(StoreRow::from(&scored).similarity, Some(0.7));
    }

    #[test]
    fn test_missing_settings_disable_store() {
        let timeout = Duration::from_secs(1);
        assert!(RestTableStore::from_settings(None, Some("k"), timeout).unwrap().is_none());
        assert!(RestTableStore::from_settings(Some("https://x.supabase.co"), None, timeout).unwrap().is_none());
        assert!(RestTableStore::from_settings(Some(" "), Some("k"), timeout).unwrap().is_none());
        assert!(RestTableStore::from_settings(Some("https://x.supabase.co"), Some("k"), timeout).unwrap().is_some());
    }

    #[test]
    fn test_endpoint_carries_conflict_key() {
        let store = RestTableStore::new("https://x.supabase.co/", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(
            store.endpoint("fraud_articles", "url"),
            "https://x.supabase.co/rest/v1/fraud_articles?on_conflict=url"
        );
    }

    #[tokio::test]
    async fn test_upsert_posts_rows_and_reports_rejection() {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
        let base_url = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for status in [201u16, 409] {
                let mut request = server.recv().unwrap();
                let mut body = String::new();
                request.as_reader().read_to_string(&mut body).unwrap();
                seen.push((request.url().to_string(), body));
                let _ = request.respond(tiny_http::Response::from_string("dup").with_status_code(status));
            }
            seen
        });

        let store = RestTableStore::new(&base_url, "secret", Duration::from_secs(5)).unwrap();
        let records = vec![record(Some(0.9))];
        assert_eq!(store.upsert("articles_all", &records, "url").await.unwrap(), 1);
        let err = store.upsert("articles_all", &records, "url").await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 409, .. }));

        let seen = handle.join().unwrap();
        assert_eq!(seen[0].0, "/rest/v1/articles_all?on_conflict=url");
        assert!(seen[0].1.contains("\"similarity\":0.9"));
    }

    #[tokio::test]
    async fn test_upsert_empty_batch_is_noop() {
        let store = RestTableStore::new("http://127.0.0.1:9", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(store.upsert("t", &[], "url").await.unwrap(), 0);
    }
}
