use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, instrument};

use super::clues::{parse_clues, Clue};
use super::BackportError;
use crate::github::{Fetch, FetchError, API_BASE};
use crate::pr::{self, PrError, PrReference, PullRequestRecord, UrlResolver};

/// Works out which pull request a backport was cherry-picked from.
pub struct OriginResolver {
    fetch: Arc<dyn Fetch>,
    urls: UrlResolver,
    orgs: Vec<String>,
}

impl OriginResolver {
    pub fn new(fetch: Arc<dyn Fetch>, urls: UrlResolver, orgs: Vec<String>) -> Self {
        Self { fetch, urls, orgs }
    }

    pub fn urls(&self) -> &UrlResolver {
        &self.urls
    }

    pub(crate) fn fetcher(&self) -> &dyn Fetch {
        self.fetch.as_ref()
    }

    pub async fn fetch_pr(&self, reference: &PrReference) -> Result<PullRequestRecord, PrError> {
        pr::fetch_pull_request(self.fetch.as_ref(), &self.urls, reference).await
    }

    /// Fetch the referenced PR, then guess its original.
    pub async fn guess_original_ref(
        &self,
        reference: &PrReference,
    ) -> Result<Vec<PullRequestRecord>, BackportError> {
        let pr = self.fetch_pr(reference).await?;
        self.guess_original(&pr).await
    }

    /// Candidate originals for `pr`, most likely first.
    ///
    /// Every clue in the title and body is followed; nothing short-circuits,
    /// so a PR reachable through two clues appears twice. `pr` itself is never
    /// returned. References that fail to resolve are skipped; a failing
    /// commit search is an error.
    #[instrument(skip(self, pr), fields(pr = pr.number()))]
    pub async fn guess_original(
        &self,
        pr: &PullRequestRecord,
    ) -> Result<Vec<PullRequestRecord>, BackportError> {
        let mut candidates = Vec::new();

        for clue in parse_clues(pr.title(), pr.body()) {
            debug!(?clue, "following clue");
            match clue {
                Clue::TitleRef(number) => {
                    candidates.extend(self.try_candidate(&PrReference::Number(number)).await);
                }
                Clue::TicketRef(reference) => {
                    candidates.extend(self.try_candidate(&reference).await);
                }
                Clue::CherryPick(hash) | Clue::CommitUrl { hash, .. } => {
                    candidates.extend(self.prs_for_commit(&hash).await?);
                }
            }
        }

        candidates.retain(|c| c.number() != pr.number());
        debug!(candidates = candidates.len(), "origin candidates");
        Ok(candidates)
    }

    /// A dangling or renumbered reference is not fatal to the search.
    async fn try_candidate(&self, reference: &PrReference) -> Option<PullRequestRecord> {
        match self.fetch_pr(reference).await {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                debug!(%reference, error = %e, "skipping unresolvable reference");
                None
            }
        }
    }

    /// All pull requests, across the configured organizations, that contain `sha`.
    #[instrument(skip(self))]
    pub async fn prs_for_commit(&self, sha: &str) -> Result<Vec<PullRequestRecord>, BackportError> {
        let mut query = format!("hash:{}", sha);
        for org in &self.orgs {
            query.push_str(&format!(" org:{}", org));
        }
        query.push_str(" is:public");
        let search_url = reqwest::Url::parse_with_params(
            &format!("{}/search/commits", API_BASE),
            &[("per_page", "100"), ("q", query.as_str())],
        )
        .map_err(|e| BackportError::Query(e.to_string()))?;

        let results = self.fetch.fetch_json(search_url.as_str()).await?;
        let repos: Vec<String> = results
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.pointer("/repository/full_name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        debug!(repos = repos.len(), "commit search hits");

        let mut references = Vec::new();
        for repo in &repos {
            let url = format!("{}/repos/{}/commits/{}/pulls?per_page=100", API_BASE, repo, sha);
            match self.fetch.fetch_json(&url).await? {
                Value::Array(prs) => references.extend(prs.iter().map(PrReference::from_json)),
                _ => {
                    return Err(BackportError::Fetch(FetchError::UnexpectedShape {
                        url,
                        detail: "expected an array of pull requests".to_string(),
                    }))
                }
            }
        }

        // The listing lacks the scoring fields, so each PR is fetched in full.
        let prs = try_join_all(references.iter().map(|r| self.fetch_pr(r))).await?;
        Ok(prs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::mock::MockFetcher;
    use crate::pr::testing::with_pr;
    use serde_json::json;

    const SHA: &str = "0a8d5c098367a58eaff10fd5b3868f099c1e17a7";

    fn commit_search_url(sha: &str) -> String {
        format!(
            "https://api.github.com/search/commits?per_page=100&q=hash%3A{}+org%3Aansible+org%3Aansible-collections+is%3Apublic",
            sha
        )
    }

    fn resolver(fetcher: MockFetcher) -> OriginResolver {
        OriginResolver::new(
            Arc::new(fetcher),
            UrlResolver::default(),
            vec!["ansible".to_string(), "ansible-collections".to_string()],
        )
    }

    fn with_commit(fetcher: MockFetcher, sha: &str, repo: &str, numbers: &[u64]) -> MockFetcher {
        let prs: Vec<Value> = numbers
            .iter()
            .map(|n| {
                json!({
                    "number": n,
                    "html_url": format!("https://github.com/{}/pull/{}", repo, n),
                    "url": format!("https://api.github.com/repos/{}/pulls/{}", repo, n),
                })
            })
            .collect();
        fetcher
            .with_json(
                &commit_search_url(sha),
                json!({"total_count": 1, "items": [{"sha": sha, "repository": {"full_name": repo}}]}),
            )
            .with_json(
                &format!("https://api.github.com/repos/{}/commits/{}/pulls?per_page=100", repo, sha),
                Value::Array(prs),
            )
    }

    #[tokio::test]
    async fn test_title_reference() {
        let fetcher = MockFetcher::new();
        let fetcher = with_pr(fetcher, "ansible/ansible", 72000, "[stable-2.10] Fix (backport of #54321)", "", "");
        let fetcher = with_pr(fetcher, "ansible/ansible", 54321, "Fix", "", "");
        let finder = resolver(fetcher);

        let origins = finder.guess_original_ref(&72000u64.into()).await.unwrap();
        let numbers: Vec<u64> = origins.iter().map(|o| o.number()).collect();
        assert_eq!(numbers, vec![54321]);
    }

    #[tokio::test]
    async fn test_cherry_pick_line_triggers_commit_lookup() {
        let body = format!("##### SUMMARY\nBackport\n\n(cherry picked from commit {})", SHA);
        let fetcher = with_pr(MockFetcher::new(), "ansible/ansible", 72001, "[stable-2.10] Fix copy", &body, "");
        let fetcher = with_pr(fetcher, "ansible/ansible", 71000, "Fix copy", "", "");
        let fetcher = with_commit(fetcher, SHA, "ansible/ansible", &[71000, 72001]);
        let finder = resolver(fetcher);

        let origins = finder.guess_original_ref(&72001u64.into()).await.unwrap();
        let numbers: Vec<u64> = origins.iter().map(|o| o.number()).collect();
        // The backport itself shows up in the commit's PR list and is dropped.
        assert_eq!(numbers, vec![71000]);
    }

    #[tokio::test]
    async fn test_commit_url_line_triggers_commit_lookup() {
        let body = format!("Backport of https://github.com/ansible/ansible/commit/{}", SHA);
        let fetcher = with_pr(MockFetcher::new(), "ansible/ansible", 72006, "[stable-2.10] Fix copy", &body, "");
        let fetcher = with_pr(fetcher, "ansible/ansible", 71000, "Fix copy", "", "");
        let fetcher = with_commit(fetcher, SHA, "ansible/ansible", &[71000]);
        let finder = resolver(fetcher);

        let origins = finder.guess_original_ref(&72006u64.into()).await.unwrap();
        let numbers: Vec<u64> = origins.iter().map(|o| o.number()).collect();
        assert_eq!(numbers, vec![71000]);
    }

    #[tokio::test]
    async fn test_commit_lookup_spans_repositories() {
        let fetcher = with_pr(MockFetcher::new(), "ansible-collections/community.general", 1176, "Fix", "", "");
        let fetcher = with_commit(fetcher, "abc123", "ansible-collections/community.general", &[1176]);
        let finder = resolver(fetcher);

        let prs = finder.prs_for_commit("abc123").await.unwrap();
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].html_url(), "https://github.com/ansible-collections/community.general/pull/1176");
    }

    #[tokio::test]
    async fn test_commit_search_without_hits() {
        let fetcher = MockFetcher::new().with_json(&commit_search_url("abc123"), json!({"total_count": 0, "items": []}));
        let finder = resolver(fetcher);
        assert!(finder.prs_for_commit("abc123").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_search_failure_propagates() {
        let body = "(cherry picked from commit abc123)";
        let fetcher = with_pr(MockFetcher::new(), "ansible/ansible", 72002, "Fix", body, "");
        let finder = resolver(fetcher);

        let result = finder.guess_original_ref(&72002u64.into()).await;
        assert!(matches!(result, Err(BackportError::Fetch(FetchError::Http { status: 404, .. }))));
    }

    #[tokio::test]
    async fn test_body_references_skip_failures() {
        let body = "Backport of #71001 and #404404\nAlso ansible-collections/community.general#1176\nsee https://github.com/ansible/ansible/pull/71002";
        let fetcher = with_pr(MockFetcher::new(), "ansible/ansible", 72003, "Backport stuff", body, "");
        let fetcher = with_pr(fetcher, "ansible/ansible", 71001, "A", "", "");
        let fetcher = with_pr(fetcher, "ansible/ansible", 71002, "B", "", "");
        let fetcher = with_pr(fetcher, "ansible-collections/community.general", 1176, "C", "", "");
        let finder = resolver(fetcher);

        let origins = finder.guess_original_ref(&72003u64.into()).await.unwrap();
        let numbers: Vec<u64> = origins.iter().map(|o| o.number()).collect();
        assert_eq!(numbers, vec![71001, 1176, 71002]);
    }

    #[tokio::test]
    async fn test_self_references_are_excluded_and_duplicates_kept() {
        let body = "Backport of #71003\nThis is #72004\nhttps://github.com/ansible/ansible/pull/71003";
        let fetcher = with_pr(MockFetcher::new(), "ansible/ansible", 72004, "Fix (#72004)", body, "");
        let fetcher = with_pr(fetcher, "ansible/ansible", 71003, "Orig", "", "");
        let finder = resolver(fetcher);

        let origins = finder.guess_original_ref(&72004u64.into()).await.unwrap();
        let numbers: Vec<u64> = origins.iter().map(|o| o.number()).collect();
        assert_eq!(numbers, vec![71003, 71003]);
        assert!(origins.iter().all(|o| o.number() != 72004));
    }

    #[tokio::test]
    async fn test_no_clues_means_no_candidates() {
        let fetcher = with_pr(MockFetcher::new(), "ansible/ansible", 72005, "Tidy", "Nothing here", "");
        let finder = resolver(fetcher);
        assert!(finder.guess_original_ref(&72005u64.into()).await.unwrap().is_empty());
    }
}
