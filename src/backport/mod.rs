pub mod aggregator;
pub mod clues;
pub mod resolver;

pub use aggregator::{BackportAggregator, BackportCollection};
pub use resolver::OriginResolver;

use thiserror::Error;

use crate::github::FetchError;
use crate::pr::PrError;

#[derive(Debug, Error)]
pub enum BackportError {
    #[error(transparent)]
    Pr(#[from] PrError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to build search query: {0}")]
    Query(String),

    /// Origin lookups came back with a different count than the PRs that
    /// were looked up. Always an internal bug.
    #[error("Origin resolution returned {results} results for {prs} pull requests")]
    ConsistencyViolation { prs: usize, results: usize },
}
