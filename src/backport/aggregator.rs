use std::collections::BTreeMap;

use futures::future::{join_all, try_join_all};
use serde_json::Value;
use tracing::{debug, info, info_span, instrument, Instrument};

use super::resolver::OriginResolver;
use super::BackportError;
use crate::github::API_BASE;
use crate::pr::{Backport, PrError, PrReference, PullRequestRecord};

/// Highest risk seen so far, kept separately for backports and their originals.
///
/// Owned by a single aggregation call; the renderer divides by these to
/// show each PR's risk as a percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RiskMaxima {
    pub max_risk: f64,
    pub max_original_risk: f64,
}

impl RiskMaxima {
    pub fn observe(&mut self, backport: &Backport) {
        self.max_risk = self.max_risk.max(backport.pr().risk());
        if let Some(original) = backport.original() {
            self.max_original_risk = self.max_original_risk.max(original.risk());
        }
    }
}

/// Backports per release line, plus the maxima used to normalize their risk.
#[derive(Debug, Clone, Default)]
pub struct BackportCollection {
    pub by_version: BTreeMap<String, Vec<Backport>>,
    pub maxima: RiskMaxima,
}

impl BackportCollection {
    pub fn max_risk(&self) -> f64 {
        self.maxima.max_risk
    }

    pub fn max_original_risk(&self) -> f64 {
        self.maxima.max_original_risk
    }

    pub fn total(&self) -> usize {
        self.by_version.values().map(Vec::len).sum()
    }
}

pub struct BackportAggregator {
    origins: OriginResolver,
    exclude_labels: Vec<String>,
}

impl BackportAggregator {
    pub fn new(origins: OriginResolver, exclude_labels: Vec<String>) -> Self {
        Self {
            origins,
            exclude_labels,
        }
    }

    fn search_query(&self, version: &str) -> String {
        let mut query = format!(
            "is:pr is:open repo:{} label:backport",
            self.origins.urls().default_repo()
        );
        for label in &self.exclude_labels {
            query.push_str(&format!(" -label:{}", label));
        }
        query.push_str(&format!(" base:stable-{}", version));
        query
    }

    /// Open backport PRs targeting `stable-{version}`, fully fetched with diffs.
    #[instrument(skip(self))]
    pub async fn backports_for_version(
        &self,
        version: &str,
    ) -> Result<Vec<PullRequestRecord>, BackportError> {
        let query = self.search_query(version);
        let url = reqwest::Url::parse_with_params(
            &format!("{}/search/issues", API_BASE),
            &[("per_page", "100"), ("sort", "created"), ("q", query.as_str())],
        )
        .map_err(|e| BackportError::Query(e.to_string()))?;

        let hits = self
            .origins
            .fetcher()
            .fetch_all_pages(url.as_str(), Some("items"))
            .await?;
        debug!(hits = hits.len(), %query, "backport search results");

        // Search hits are partial issue records; refetch each as a full PR.
        let references = hits
            .iter()
            .map(|hit| {
                hit.get("number")
                    .and_then(Value::as_u64)
                    .map(PrReference::Number)
                    .ok_or_else(|| PrError::InvalidPayload("search hit without \"number\"".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let prs = try_join_all(references.iter().map(|r| self.origins.fetch_pr(r))).await?;
        Ok(prs)
    }

    /// Collect backports and their most likely originals for each version.
    ///
    /// Versions are processed one after another; within a version every
    /// origin lookup runs concurrently and results are paired by position.
    pub async fn collect(&self, versions: &[String]) -> Result<BackportCollection, BackportError> {
        let mut collection = BackportCollection::default();

        for version in versions {
            let span = info_span!("version", %version);
            let backports = self.collect_version(version).instrument(span).await?;
            for backport in &backports {
                collection.maxima.observe(backport);
            }
            info!(%version, backports = backports.len(), "collected backports");
            collection.by_version.insert(version.clone(), backports);
        }

        Ok(collection)
    }

    async fn collect_version(&self, version: &str) -> Result<Vec<Backport>, BackportError> {
        let prs = self.backports_for_version(version).await?;
        let origins = join_all(prs.iter().map(|pr| self.origins.guess_original(pr))).await;

        if origins.len() != prs.len() {
            return Err(BackportError::ConsistencyViolation {
                prs: prs.len(),
                results: origins.len(),
            });
        }

        let mut backports = Vec::with_capacity(prs.len());
        for (pr, candidates) in prs.into_iter().zip(origins) {
            let original = candidates?.into_iter().next();
            debug!(pr = pr.number(), original = ?original.as_ref().map(|o| o.number()), "paired backport");
            backports.push(Backport::new(pr, original)?);
        }
        Ok(backports)
    }
}
