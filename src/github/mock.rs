//! In-memory `Fetch` implementation for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{page_items, Fetch, FetchError};

/// Serves canned responses keyed by exact URL. Unknown URLs answer 404.
#[derive(Default)]
pub struct MockFetcher {
    json: HashMap<String, Value>,
    text: HashMap<String, String>,
    pages: HashMap<String, Vec<Value>>,
    requested: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, url: &str, value: Value) -> Self {
        self.json.insert(url.to_string(), value);
        self
    }

    pub fn with_text(mut self, url: &str, body: &str) -> Self {
        self.text.insert(url.to_string(), body.to_string());
        self
    }

    /// Register a paginated listing; each entry is one page as returned by the API.
    pub fn with_pages(mut self, url: &str, pages: Vec<Value>) -> Self {
        self.pages.insert(url.to_string(), pages);
        self
    }

    /// Every URL requested so far, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    fn record(&self, url: &str) {
        self.requested.lock().unwrap().push(url.to_string());
    }

    fn not_found(url: &str) -> FetchError {
        FetchError::Http {
            status: 404,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Fetch for MockFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        self.record(url);
        self.json.get(url).cloned().ok_or_else(|| Self::not_found(url))
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.record(url);
        self.text.get(url).cloned().ok_or_else(|| Self::not_found(url))
    }

    async fn fetch_all_pages(
        &self,
        url: &str,
        key: Option<&str>,
    ) -> Result<Vec<Value>, FetchError> {
        self.record(url);
        let pages = self.pages.get(url).ok_or_else(|| Self::not_found(url))?;
        let mut all = Vec::new();
        for page in pages {
            all.extend(page_items(url, page.clone(), key)?);
        }
        Ok(all)
    }
}
