//! In-memory fakes shared by the unit tests.

use crate::diagnostics::DiagnosticSink;
use crate::fetcher::{FetchError, PageKind, PageSource};
use std::collections::HashMap;
use std::sync::Mutex;

/// A [`PageSource`] replaying canned responses. Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct FakeSource {
    responses: HashMap<String, Result<String, FetchError>>,
    requested: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.responses.insert(url.to_string(), Ok(html.to_string()));
        self
    }

    pub fn fail(mut self, url: &str, err: FetchError) -> Self {
        self.responses.insert(url.to_string(), Err(err));
        self
    }

    /// URLs fetched so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl PageSource for FakeSource {
    async fn fetch(&self, url: &str, _kind: PageKind) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.responses.get(url).cloned().unwrap_or_else(|| {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        })
    }
}

/// A [`DiagnosticSink`] that remembers which pages it was handed.
#[derive(Debug, Default)]
pub struct RecordingSink {
    dumps: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn urls(&self) -> Vec<String> {
        self.dumps.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn dumps(&self) -> Vec<(String, String)> {
        self.dumps.lock().unwrap().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    async fn unrecognized_layout(&self, url: &str, html: &str) {
        self.dumps
            .lock()
            .unwrap()
            .push((url.to_string(), html.to_string()));
    }
}
