use std::fmt;

use serde::Deserialize;

use super::PrError;

/// An `owner/name` pair identifying a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    /// GitHub treats owner and repository names case-insensitively.
    pub fn matches(&self, owner: &str, name: &str) -> bool {
        self.owner.eq_ignore_ascii_case(owner) && self.name.eq_ignore_ascii_case(name)
    }
}

impl Default for RepoSlug {
    fn default() -> Self {
        Self::new("ansible", "ansible")
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Per-file line counts taken from a unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// File path (e.g., "lib/ansible/modules/copy.py")
    pub path: String,
    /// Lines added in this file
    pub added: usize,
    /// Lines removed from this file
    pub removed: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelPayload {
    pub name: String,
}

/// The subset of the GitHub pull request payload this tool reads.
///
/// Everything except `number` defaults when absent; search hits and other
/// partial records still deserialize, but only a full
/// `GET /repos/{owner}/{repo}/pulls/{n}` response carries the scoring fields.
#[derive(Debug, Clone, Deserialize)]
pub struct PrPayload {
    pub number: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub diff_url: String,
    #[serde(default)]
    pub labels: Vec<LabelPayload>,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub review_comments: u64,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changed_files: u64,
    #[serde(default)]
    pub commits: u64,
}

/// A fetched pull request: validated metadata plus its parsed diff.
///
/// Built once by [`PullRequestRecord::from_payload`] and never mutated;
/// the scoring accessors live in `risk.rs`.
#[derive(Debug, Clone)]
pub struct PullRequestRecord {
    number: u64,
    title: String,
    body: String,
    html_url: String,
    diff_url: String,
    labels: Vec<String>,
    comments: u64,
    review_comments: u64,
    additions: u64,
    deletions: u64,
    changed_files: u64,
    commits: u64,
    diff: Vec<FileChange>,
}

impl PullRequestRecord {
    pub fn from_payload(payload: PrPayload, diff: Vec<FileChange>) -> Result<Self, PrError> {
        let number = match payload.number {
            Some(n) if n > 0 => n,
            Some(_) => {
                return Err(PrError::InvalidPayload(
                    "\"number\" field must be positive".to_string(),
                ))
            }
            None => {
                return Err(PrError::InvalidPayload(
                    "did not contain \"number\" field".to_string(),
                ))
            }
        };

        let mut labels: Vec<String> = payload.labels.into_iter().map(|l| l.name).collect();
        labels.sort();
        labels.dedup();

        Ok(Self {
            number,
            title: payload.title,
            body: payload.body.unwrap_or_default(),
            html_url: payload.html_url,
            diff_url: payload.diff_url,
            labels,
            comments: payload.comments,
            review_comments: payload.review_comments,
            additions: payload.additions,
            deletions: payload.deletions,
            changed_files: payload.changed_files,
            commits: payload.commits,
            diff,
        })
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn html_url(&self) -> &str {
        &self.html_url
    }

    pub fn diff_url(&self) -> &str {
        &self.diff_url
    }

    /// Label names, sorted and deduplicated.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l == name)
    }

    pub fn comments(&self) -> u64 {
        self.comments
    }

    pub fn review_comments(&self) -> u64 {
        self.review_comments
    }

    pub fn additions(&self) -> u64 {
        self.additions
    }

    pub fn deletions(&self) -> u64 {
        self.deletions
    }

    pub fn changed_files(&self) -> u64 {
        self.changed_files
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn diff(&self) -> &[FileChange] {
        &self.diff
    }
}

/// A backport paired with the pull request it most likely came from.
#[derive(Debug, Clone)]
pub struct Backport {
    pr: PullRequestRecord,
    original: Option<PullRequestRecord>,
}

impl Backport {
    pub fn new(pr: PullRequestRecord, original: Option<PullRequestRecord>) -> Result<Self, PrError> {
        if let Some(original) = &original {
            if original.number() == pr.number() {
                return Err(PrError::SelfReferentialOrigin(pr.number()));
            }
        }
        Ok(Self { pr, original })
    }

    pub fn pr(&self) -> &PullRequestRecord {
        &self.pr
    }

    pub fn original(&self) -> Option<&PullRequestRecord> {
        self.original.as_ref()
    }
}
