#[cfg(test)]
pub mod mock;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Config;

pub const API_BASE: &str = "https://api.github.com";
pub const WEB_BASE: &str = "https://github.com";

const USER_AGENT: &str = "backport-scout";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} got status {status}")]
    Http { status: u16, url: String },

    #[error("GitHub API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to decode JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected response shape from {url}: {detail}")]
    UnexpectedShape { url: String, detail: String },

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

/// Read-only access to the code-hosting API.
///
/// The origin resolver and the aggregator only ever talk to GitHub through
/// this trait, so tests can swap in an in-memory implementation.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET a JSON document.
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError>;

    /// GET a raw text body (used for `.diff` URLs).
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

    /// GET every page of a paginated listing and concatenate the results.
    ///
    /// With `key` set, each page is an object whose `key` field holds the
    /// items (the search API shape); otherwise each page is itself an array.
    async fn fetch_all_pages(&self, url: &str, key: Option<&str>)
        -> Result<Vec<Value>, FetchError>;
}

/// Pull the items out of a single page of a paginated response.
pub fn page_items(url: &str, page: Value, key: Option<&str>) -> Result<Vec<Value>, FetchError> {
    let items = match key {
        Some(key) => match page {
            Value::Object(mut map) => map.remove(key).ok_or_else(|| FetchError::UnexpectedShape {
                url: url.to_string(),
                detail: format!("missing `{}` field", key),
            })?,
            _ => {
                return Err(FetchError::UnexpectedShape {
                    url: url.to_string(),
                    detail: "expected an object page".to_string(),
                })
            }
        },
        None => page,
    };

    match items {
        Value::Array(items) => Ok(items),
        _ => Err(FetchError::UnexpectedShape {
            url: url.to_string(),
            detail: "expected an array of items".to_string(),
        }),
    }
}

/// reqwest-backed GitHub REST client.
pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    calls: AtomicUsize,
}

impl GitHubClient {
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let token = config.github_token().ok_or(FetchError::MissingToken)?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.github.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            token,
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of successful requests issued so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(response)
    }

    async fn json_body(url: &str, response: reqwest::Response) -> Result<Value, FetchError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl Fetch for GitHubClient {
    #[instrument(skip(self))]
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let response = self.get(url).await?;
        Self::json_body(url, response).await
    }

    #[instrument(skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    #[instrument(skip(self))]
    async fn fetch_all_pages(
        &self,
        url: &str,
        key: Option<&str>,
    ) -> Result<Vec<Value>, FetchError> {
        let mut all = Vec::new();
        let mut next_url = Some(url.to_string());
        let mut pages = 0usize;

        while let Some(page_url) = next_url.take() {
            let response = self.get(&page_url).await?;
            next_url = parse_link_next(response.headers());
            let page = Self::json_body(&page_url, response).await?;
            all.extend(page_items(&page_url, page, key)?);
            pages += 1;
        }

        debug!(pages, items = all.len(), "fetched all pages");
        Ok(all)
    }
}

/// Parse the `Link` header to find the `rel="next"` URL.
fn parse_link_next(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(header::LINK)?.to_str().ok()?;
    for part in link.split(',') {
        let part = part.trim();
        if part.contains("rel=\"next\"") {
            let start = part.find('<')? + 1;
            let end = part.find('>')?;
            return Some(part[start..end].to_string());
        }
    }
    None
}
