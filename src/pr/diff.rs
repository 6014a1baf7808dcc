use std::sync::LazyLock;

use regex::Regex;

use super::types::FileChange;
use super::PrError;

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -\d+(?:,(?P<old>\d+))? \+\d+(?:,(?P<new>\d+))? @@").expect("valid hunk regex")
});

/// Lines still owed by the current hunk, per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkSpan {
    old_left: usize,
    new_left: usize,
}

impl HunkSpan {
    fn is_done(&self) -> bool {
        self.old_left == 0 && self.new_left == 0
    }
}

/// Parse a unified diff string into one FileChange per file.
///
/// The input is the raw text served from a pull request's `diff_url`.
///
/// Each file section starts with:
///   diff --git a/{path} b/{path}
///
/// Hunks start with: @@ -{old_start},{old_count} +{new_start},{new_count} @@
///
/// The path is taken from the `+++ b/` header (`--- a/` for deletions), which
/// keeps spaces intact. A hunk ends once its old and new line counts are used
/// up, so only lines inside a hunk are counted.
pub fn parse_diff(raw_diff: &str) -> Result<Vec<FileChange>, PrError> {
    if raw_diff.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let mut current_file: Option<FileChange> = None;
    let mut hunk: Option<HunkSpan> = None;

    for line in raw_diff.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            files.extend(current_file.take());
            hunk = None;
            current_file = Some(FileChange {
                path: path_from_git_header(rest)?,
                added: 0,
                removed: 0,
            });
            continue;
        }

        if line.starts_with("@@") {
            if current_file.is_none() {
                return Err(PrError::DiffParse("Hunk outside of a file section".to_string()));
            }
            hunk = Some(parse_hunk_header(line)?).filter(|span| !span.is_done());
            continue;
        }

        let Some(span) = hunk.as_mut() else {
            // File headers: index, mode changes, ---/+++ paths, rename info.
            if let (Some(file), Some(path)) = (current_file.as_mut(), header_path(line)) {
                file.path = path;
            }
            continue;
        };
        let Some(file) = current_file.as_mut() else {
            continue;
        };

        match line.as_bytes().first() {
            Some(b'+') => {
                file.added += 1;
                span.new_left = span.new_left.saturating_sub(1);
            }
            Some(b'-') => {
                file.removed += 1;
                span.old_left = span.old_left.saturating_sub(1);
            }
            // "\ No newline at end of file"
            Some(b'\\') => {}
            _ => {
                span.old_left = span.old_left.saturating_sub(1);
                span.new_left = span.new_left.saturating_sub(1);
            }
        }
        if span.is_done() {
            hunk = None;
        }
    }

    files.extend(current_file);
    Ok(files)
}

/// Best-effort path from `a/{path} b/{path}`; the ---/+++ headers refine it.
fn path_from_git_header(rest: &str) -> Result<String, PrError> {
    let (a_side, b_side) = rest
        .split_once(" b/")
        .ok_or_else(|| PrError::DiffParse(format!("Missing b/ path in diff header: {}", rest)))?;
    if !b_side.is_empty() {
        return Ok(b_side.to_string());
    }
    a_side
        .strip_prefix("a/")
        .map(str::to_string)
        .ok_or_else(|| PrError::DiffParse(format!("Missing a/ path in diff header: {}", rest)))
}

/// `+++ b/{path}` names the file; `--- a/{path}` only matters when the new
/// side is /dev/null, and it always precedes the `+++` line.
fn header_path(line: &str) -> Option<String> {
    let path = line
        .strip_prefix("+++ b/")
        .or_else(|| line.strip_prefix("--- a/"))?;
    // git appends a tab after names containing spaces
    Some(path.trim_end_matches('\t').to_string())
}

fn parse_hunk_header(line: &str) -> Result<HunkSpan, PrError> {
    let caps = HUNK_HEADER
        .captures(line)
        .ok_or_else(|| PrError::DiffParse(format!("Invalid hunk header: {}", line)))?;
    let count = |name: &str| -> Result<usize, PrError> {
        match caps.name(name) {
            Some(m) => m
                .as_str()
                .parse()
                .map_err(|_| PrError::DiffParse(format!("Invalid range count in {}", line))),
            None => Ok(1),
        }
    };
    Ok(HunkSpan {
        old_left: count("old")?,
        new_left: count("new")?,
    })
}
