//! Single-pass extraction of origin hints from a backport's title and body.

use std::sync::LazyLock;

use regex::Regex;

use crate::pr::{PrReference, RepoSlug};

static TITLE_BACKPORT_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\((?:backport of )?#?(?P<number>\d+)\)").expect("valid title ref regex")
});

static CHERRY_PICKED_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\(?cherry[- ]picked from(?: commit)? (?P<hash>\w+)(?:\)|\.|$)")
        .expect("valid cherry-pick regex")
});

static COMMIT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://(?:www\.)?github\.com/(?P<owner>[^/\s]+)/(?P<repo>[^/\s]+)/commit/(?P<hash>\w+)",
    )
    .expect("valid commit URL regex")
});

static BARE_TICKET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)#(?P<number>\d+)").expect("valid ticket regex")
});

static PULL_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://(?:www\.)?github\.com/(?P<owner>[^/\s]+)/(?P<repo>[^/\s]+)/pull/(?P<number>\d+)",
    )
    .expect("valid pull URL regex")
});

static SHORT_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<owner>[\w.-]+)/(?P<repo>[\w.-]+)#(?P<number>\d+)").expect("valid short ref regex")
});

/// One hint about where a backport came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clue {
    /// `(#1234)` or `(backport of #1234)` in the title.
    TitleRef(u64),
    /// A `(cherry picked from commit <sha>)` trailer line.
    CherryPick(String),
    /// A link to a commit page.
    CommitUrl { repo: RepoSlug, hash: String },
    /// `#1234`, `owner/repo#1234` or a pull request URL in the body.
    TicketRef(PrReference),
}

/// Collect every clue in title-then-body order.
///
/// Within one body line a cherry-pick trailer wins over a commit link, which
/// wins over PR references; a line yields PR references only when it has
/// neither of the other two.
pub fn parse_clues(title: &str, body: &str) -> Vec<Clue> {
    let mut clues = Vec::new();

    if let Some(number) = TITLE_BACKPORT_REF
        .captures(title)
        .and_then(|caps| caps["number"].parse::<u64>().ok())
    {
        clues.push(Clue::TitleRef(number));
    }

    for line in body.lines() {
        clues.extend(parse_line(line));
    }

    clues
}

fn parse_line(line: &str) -> Vec<Clue> {
    if let Some(caps) = CHERRY_PICKED_FROM.captures(line) {
        return vec![Clue::CherryPick(caps["hash"].to_string())];
    }

    if let Some(caps) = COMMIT_URL.captures(line) {
        return vec![Clue::CommitUrl {
            repo: RepoSlug::new(&caps["owner"], &caps["repo"]),
            hash: caps["hash"].to_string(),
        }];
    }

    let mut refs = Vec::new();
    for caps in BARE_TICKET.captures_iter(line) {
        if let Ok(number) = caps["number"].parse::<u64>() {
            refs.push(Clue::TicketRef(PrReference::Number(number)));
        }
    }
    for m in PULL_URL.find_iter(line) {
        refs.push(Clue::TicketRef(PrReference::from(m.as_str())));
    }
    for m in SHORT_REF.find_iter(line) {
        refs.push(Clue::TicketRef(PrReference::from(m.as_str())));
    }
    refs
}
