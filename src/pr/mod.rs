pub mod diff;
pub mod risk;
pub mod types;
pub mod url;

pub use types::{Backport, PrPayload, PullRequestRecord, RepoSlug};
pub use url::{PrReference, ReferenceError, UrlResolver};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::github::{Fetch, FetchError};

#[derive(Debug, Error)]
pub enum PrError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("Pull request payload rejected: {0}")]
    InvalidPayload(String),

    #[error("Failed to parse diff: {0}")]
    DiffParse(String),

    #[error("Relative risk is undefined when the maximum risk is zero")]
    DivisionUndefined,

    #[error("PR #{0} cannot be its own original")]
    SelfReferentialOrigin(u64),
}

/// Fetch a complete PullRequestRecord (metadata + parsed diff).
///
/// 1. Normalize the reference to its REST endpoint (any repository)
/// 2. GET the endpoint and validate the payload
/// 3. GET the payload's `diff_url` and parse it
#[instrument(skip(fetch, resolver), fields(pr = %reference))]
pub async fn fetch_pull_request(
    fetch: &dyn Fetch,
    resolver: &UrlResolver,
    reference: &PrReference,
) -> Result<PullRequestRecord, PrError> {
    let api_url = resolver.api_url(reference)?;

    debug!(%api_url, "fetching PR metadata");
    let value = fetch.fetch_json(&api_url).await?;
    let payload: PrPayload = serde_json::from_value(value)
        .map_err(|e| PrError::InvalidPayload(format!("{}: {}", api_url, e)))?;
    debug!(number = ?payload.number, title = %payload.title, "received PR metadata");

    if payload.diff_url.is_empty() {
        return Err(PrError::InvalidPayload(format!("{}: missing diff_url", api_url)));
    }
    let diff_text = fetch.fetch_text(&payload.diff_url).await?;
    let files = diff::parse_diff(&diff_text)?;
    debug!(parsed_files = files.len(), diff_bytes = diff_text.len(), "parsed diff");

    PullRequestRecord::from_payload(payload, files)
}
