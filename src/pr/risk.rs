//! Triage signals derived from a pull request's metadata and diff.
//!
//! The score is a coarse, monotonic indicator rather than a calibrated
//! statistic. Bucket boundaries and point values are part of the output
//! contract: reports from different runs are compared against each other.

use super::types::{FileChange, PullRequestRecord};
use super::PrError;

/// Points available across all factors. Scores are divided by this.
pub const MAX_POINTS: f64 = 60.0;

/// Paths whose modification weighs more heavily: core library, test
/// harness, licensing and packaging.
pub const SENSITIVE_PATH_PREFIXES: &[&str] = &[
    "lib/ansible/",
    "bin/",
    "test/lib/ansible_test/",
    "test/runner/",
    "licenses/",
    "COPYING",
    "setup.py",
    "setup.cfg",
    "requirements.txt",
    "MANIFEST.in",
    "pyproject.toml",
];

pub const CHANGELOG_FRAGMENT_PREFIX: &str = "changelogs/fragments/";
pub const DOCS_PATH_PREFIX: &str = "docs/docsite/";
pub const DOCS_LABEL: &str = "docs";
pub const NEEDS_INFO_LABEL: &str = "needs_info";

pub fn is_sensitive_path(path: &str) -> bool {
    SENSITIVE_PATH_PREFIXES.iter().any(|p| path.starts_with(p))
}

fn comment_points(comments: u64) -> u64 {
    if comments > 5 {
        10
    } else {
        comments * 2
    }
}

/// Review engagement. Keyed on the issue comment count, not
/// `review_comments`; see DESIGN.md before changing.
fn review_points(comments: u64) -> u64 {
    match comments {
        c if c > 3 => 10,
        3 => 8,
        2 => 4,
        _ => 1,
    }
}

fn size_points(additions: u64, deletions: u64) -> u64 {
    let lines = additions.saturating_add(deletions);
    if lines < 10 {
        1
    } else if lines < 25 {
        3
    } else {
        5
    }
}

fn breadth_points(changed_files: u64) -> u64 {
    if changed_files < 3 {
        1
    } else if changed_files < 5 {
        3
    } else {
        5
    }
}

fn commit_points(commits: u64) -> u64 {
    if commits < 3 {
        commits
    } else {
        5
    }
}

fn sensitive_path_points(diff: &[FileChange]) -> u64 {
    let (files, lines) = diff
        .iter()
        .filter(|f| is_sensitive_path(&f.path))
        .fold((0usize, 0usize), |(files, lines), f| {
            (files.saturating_add(1), lines.saturating_add(f.added).saturating_add(f.removed))
        });

    if files > 5 && lines > 25 {
        10
    } else if files > 2 && lines > 10 {
        7
    } else if files > 0 && lines > 20 {
        5
    } else if files > 0 {
        3
    } else {
        0
    }
}

impl PullRequestRecord {
    /// Risk score in [0, 1].
    pub fn risk(&self) -> f64 {
        let points = comment_points(self.comments())
            + review_points(self.comments())
            + size_points(self.additions(), self.deletions())
            + breadth_points(self.changed_files())
            + commit_points(self.commits())
            + sensitive_path_points(self.diff());
        points as f64 / MAX_POINTS
    }

    /// This PR's risk as a percentage of `max_risk`.
    pub fn relative_risk(&self, max_risk: f64) -> Result<f64, PrError> {
        if max_risk == 0.0 {
            return Err(PrError::DivisionUndefined);
        }
        Ok(self.risk() / max_risk * 100.0)
    }

    /// Touches sensitive paths without adding a changelog fragment.
    pub fn is_missing_changelog(&self) -> bool {
        let mut touches_sensitive = false;
        for file in self.diff() {
            if file.path.starts_with(CHANGELOG_FRAGMENT_PREFIX) {
                return false;
            }
            touches_sensitive |= is_sensitive_path(&file.path);
        }
        touches_sensitive
    }

    /// Labeled `docs` and only touches the documentation site. An empty diff
    /// does not count as docs-only.
    pub fn is_docs_only(&self) -> bool {
        !self.diff().is_empty()
            && self.diff().iter().all(|f| f.path.starts_with(DOCS_PATH_PREFIX))
            && self.has_label(DOCS_LABEL)
    }

    pub fn needs_info(&self) -> bool {
        self.has_label(NEEDS_INFO_LABEL)
    }
}
