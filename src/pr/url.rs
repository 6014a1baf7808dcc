use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;
use thiserror::Error;

use super::types::RepoSlug;
use crate::github::{API_BASE, WEB_BASE};

static PULL_WEB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:www\.)?github\.com/(?P<owner>[^/\s]+)/(?P<repo>[^/\s]+)/pull/(?P<number>\d+)(?:[/?#]\S*)?$",
    )
    .expect("valid pull web URL regex")
});

static PULL_API_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://api\.github\.com/repos/(?P<owner>[^/\s]+)/(?P<repo>[^/\s]+)/pulls/(?P<number>\d+)/?$",
    )
    .expect("valid pull API URL regex")
});

static PULL_SHORT_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<owner>[\w.-]+)/(?P<repo>[\w.-]+)#(?P<number>\d+)$")
        .expect("valid owner/repo#number regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Malformed pull request reference: {0}")]
    Malformed(String),

    #[error("Reference to {0} given where only the default repository is allowed")]
    ForeignRepoNotAllowed(String),

    #[error("Did not understand pull request reference: {0}")]
    Unrecognized(String),
}

/// Anything that can name a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrReference {
    /// A bare PR number in the default repository.
    Number(u64),
    /// `1234`, `owner/repo#1234`, a web URL or an API URL.
    Text(String),
    /// An API record already pointing at a pull request.
    Record {
        html_url: Option<String>,
        url: Option<String>,
    },
}

impl PrReference {
    /// Take the `html_url` / `url` fields out of a raw API object.
    pub fn from_json(value: &Value) -> Self {
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        PrReference::Record {
            html_url: field("html_url"),
            url: field("url"),
        }
    }
}

impl From<u64> for PrReference {
    fn from(number: u64) -> Self {
        PrReference::Number(number)
    }
}

impl From<&str> for PrReference {
    fn from(text: &str) -> Self {
        PrReference::Text(text.to_string())
    }
}

impl From<String> for PrReference {
    fn from(text: String) -> Self {
        PrReference::Text(text)
    }
}

impl fmt::Display for PrReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrReference::Number(n) => write!(f, "{}", n),
            PrReference::Text(text) => f.write_str(text),
            PrReference::Record { html_url, url } => write!(
                f,
                "{}",
                html_url.as_deref().or(url.as_deref()).unwrap_or("<record without url>")
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Accept references outside the default repository.
    pub allow_foreign_repo: bool,
    /// Return just the PR number.
    pub number_only: bool,
    /// Return the REST API URL instead of the web URL.
    pub api: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Number(u64),
    Url(String),
}

impl fmt::Display for Normalized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalized::Number(n) => write!(f, "{}", n),
            Normalized::Url(url) => f.write_str(url),
        }
    }
}

impl From<Normalized> for PrReference {
    fn from(normalized: Normalized) -> Self {
        match normalized {
            Normalized::Number(n) => PrReference::Number(n),
            Normalized::Url(url) => PrReference::Text(url),
        }
    }
}

/// Syntax-level normalizer for pull request references. Never touches the network.
#[derive(Debug, Clone, Default)]
pub struct UrlResolver {
    default_repo: RepoSlug,
}

impl UrlResolver {
    pub fn new(default_repo: RepoSlug) -> Self {
        Self { default_repo }
    }

    pub fn default_repo(&self) -> &RepoSlug {
        &self.default_repo
    }

    pub fn normalize(
        &self,
        reference: &PrReference,
        opts: NormalizeOptions,
    ) -> Result<Normalized, ReferenceError> {
        let (owner, repo, number) = match reference {
            PrReference::Record { html_url, url } => {
                let field = if opts.api { url } else { html_url };
                let name = if opts.api { "url" } else { "html_url" };
                let target = field
                    .as_deref()
                    .ok_or_else(|| ReferenceError::Malformed(format!("record did not have {} key", name)))?;
                if !target.contains("/pull") {
                    return Err(ReferenceError::Malformed(format!(
                        "record does not point at a pull request: {}",
                        target
                    )));
                }
                let (owner, repo, number) = parse_url_forms(target)
                    .ok_or_else(|| ReferenceError::Malformed(target.to_string()))?;
                self.check_repo(&owner, &repo, opts)?;
                (owner, repo, number)
            }
            PrReference::Number(n) => {
                if *n == 0 {
                    return Err(ReferenceError::Unrecognized(n.to_string()));
                }
                self.default_triple(*n)
            }
            PrReference::Text(text) => {
                let text = text.trim();
                let (owner, repo, number) = if is_numeric(text) {
                    let n = text
                        .parse::<u64>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| ReferenceError::Unrecognized(text.to_string()))?;
                    self.default_triple(n)
                } else {
                    PULL_SHORT_REF
                        .captures(text)
                        .and_then(|caps| triple(&caps))
                        .or_else(|| parse_url_forms(text))
                        .ok_or_else(|| ReferenceError::Unrecognized(text.to_string()))?
                };
                self.check_repo(&owner, &repo, opts)?;
                (owner, repo, number)
            }
        };

        if opts.number_only {
            return Ok(Normalized::Number(number));
        }
        Ok(Normalized::Url(pull_url(&owner, &repo, number, opts.api)))
    }

    /// REST endpoint for the referenced PR, accepting any repository.
    pub fn api_url(&self, reference: &PrReference) -> Result<String, ReferenceError> {
        let opts = NormalizeOptions {
            allow_foreign_repo: true,
            api: true,
            ..Default::default()
        };
        match self.normalize(reference, opts)? {
            Normalized::Url(url) => Ok(url),
            Normalized::Number(n) => Err(ReferenceError::Malformed(n.to_string())),
        }
    }

    fn check_repo(&self, owner: &str, repo: &str, opts: NormalizeOptions) -> Result<(), ReferenceError> {
        if !opts.allow_foreign_repo && !self.default_repo.matches(owner, repo) {
            return Err(ReferenceError::ForeignRepoNotAllowed(format!("{}/{}", owner, repo)));
        }
        Ok(())
    }

    fn default_triple(&self, number: u64) -> (String, String, u64) {
        (
            self.default_repo.owner.clone(),
            self.default_repo.name.clone(),
            number,
        )
    }
}

fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

fn parse_url_forms(text: &str) -> Option<(String, String, u64)> {
    PULL_WEB_URL
        .captures(text)
        .or_else(|| PULL_API_URL.captures(text))
        .and_then(|caps| triple(&caps))
}

fn triple(caps: &Captures<'_>) -> Option<(String, String, u64)> {
    let number = caps["number"].parse::<u64>().ok().filter(|n| *n > 0)?;
    Some((caps["owner"].to_string(), caps["repo"].to_string(), number))
}

fn pull_url(owner: &str, repo: &str, number: u64, api: bool) -> String {
    if api {
        format!("{}/repos/{}/{}/pulls/{}", API_BASE, owner, repo, number)
    } else {
        format!("{}/{}/{}/pull/{}", WEB_BASE, owner, repo, number)
    }
}
