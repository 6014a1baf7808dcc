pub mod types;

pub use types::{BackportRow, PrSummary, Report, RiskLevel, VersionSection};

use crate::backport::BackportCollection;
use crate::pr::{PrReference, PullRequestRecord};
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Summarize one PR, scaling its risk against `max_risk`.
pub fn summarize(pr: &PullRequestRecord, max_risk: f64) -> PrSummary {
    PrSummary {
        number: pr.number(),
        title: pr.title().to_string(),
        url: pr.html_url().to_string(),
        risk: pr.risk(),
        relative_risk: pr.relative_risk(max_risk).ok(),
        missing_changelog: pr.is_missing_changelog(),
        docs_only: pr.is_docs_only(),
        needs_info: pr.needs_info(),
    }
}

/// Build a Report from collected backports.
///
/// Backports are scaled against the riskiest backport, originals against
/// the riskiest original.
pub fn build(collection: &BackportCollection) -> Report {
    let sections = collection
        .by_version
        .iter()
        .map(|(version, backports)| VersionSection {
            version: version.clone(),
            rows: backports
                .iter()
                .map(|b| BackportRow {
                    backport: summarize(b.pr(), collection.max_risk()),
                    original: b
                        .original()
                        .map(|o| summarize(o, collection.max_original_risk())),
                })
                .collect(),
        })
        .collect();

    Report {
        sections,
        max_risk: collection.max_risk(),
        max_original_risk: collection.max_original_risk(),
    }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(sections = report.sections.len()))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

/// Print the ranked origin candidates for a single PR.
pub fn print_origin_candidates(reference: &PrReference, candidates: &[PullRequestRecord]) {
    println!();
    println!("Origin candidates for {}", reference);
    println!();

    if candidates.is_empty() {
        println!("  No original PR found.");
    } else {
        for (rank, candidate) in candidates.iter().enumerate() {
            let marker = if rank == 0 { "→".green().bold() } else { " ".normal() };
            println!(
                "{} #{} \"{}\" (risk {:.3}) {}",
                marker,
                candidate.number(),
                candidate.title(),
                candidate.risk(),
                candidate.html_url().dimmed()
            );
            println!("    {}", candidate_details(candidate).dimmed());
        }
    }
    println!();
}

/// labels: backport, bug | 3 comments, 1 review comment | diff: https://...
fn candidate_details(pr: &PullRequestRecord) -> String {
    let labels = if pr.labels().is_empty() {
        "none".to_string()
    } else {
        pr.labels().join(", ")
    };
    let plural = |n: u64, word: &str| {
        if n == 1 {
            format!("{} {}", n, word)
        } else {
            format!("{} {}s", n, word)
        }
    };
    format!(
        "labels: {} | {}, {} | diff: {}",
        labels,
        plural(pr.comments(), "comment"),
        plural(pr.review_comments(), "review comment"),
        pr.diff_url()
    )
}

fn percent_text(summary: &PrSummary) -> String {
    match summary.relative_risk {
        Some(pct) => format!("{:.0}%", pct),
        None => "n/a".to_string(),
    }
}

/// Format and print the report to the terminal with colors.
///
/// ═══ stable-2.10 (2 open backports) ═══
///   #72010 "Fix a" risk 100% (0.433) HIGH [missing changelog]
///       original: #71010 "Fix a" risk 100% (0.050) HIGH
fn print_terminal_report(report: &Report) {
    println!();
    println!(
        "Max risk: {:.3} | Max original risk: {:.3}",
        report.max_risk, report.max_original_risk
    );
    println!();
    for section in &report.sections {
        println!(
            "═══ stable-{} ({} open backports) ═══",
            section.version,
            section.rows.len()
        );
        if section.rows.is_empty() {
            println!("  No open backports.");
        }
        for row in &section.rows {
            println!("  {}", terminal_line(&row.backport));
            match &row.original {
                Some(original) => println!("      original: {}", terminal_line(original)),
                None => println!("      original: {}", "unknown".yellow()),
            }
        }
        println!();
    }
}

fn terminal_line(summary: &PrSummary) -> String {
    let level = summary
        .level()
        .map(|l| colorize_risk(l).to_string())
        .unwrap_or_default();
    let flags: Vec<String> = summary
        .flags()
        .iter()
        .map(|f| format!("[{}]", f).red().to_string())
        .collect();
    format!(
        "#{} \"{}\" risk {} ({:.3}) {} {}",
        summary.number,
        summary.title,
        percent_text(summary),
        summary.risk,
        level,
        flags.join(" ")
    )
    .trim_end()
    .to_string()
}

/// Write the report as a markdown file.
///
/// ## stable-2.10
/// | PR | Risk | Flags | Original | Original risk |
fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    let mut md = String::new();
    md.push_str("# Open backports\n\n");
    md.push_str(&format!(
        "Risk is relative to the riskiest backport ({:.3}) and the riskiest original ({:.3}).\n\n",
        report.max_risk, report.max_original_risk
    ));

    for section in &report.sections {
        md.push_str(&format!("## stable-{}\n\n", section.version));
        if section.rows.is_empty() {
            md.push_str("No open backports.\n\n");
            continue;
        }
        md.push_str("| PR | Risk | Flags | Original | Original risk |\n");
        md.push_str("|----|------|-------|----------|---------------|\n");
        for row in &section.rows {
            let (original, original_risk) = match &row.original {
                Some(o) => (markdown_link(o), percent_text(o)),
                None => ("unknown".to_string(), String::new()),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                markdown_link(&row.backport),
                percent_text(&row.backport),
                row.backport.flags().join(", "),
                original,
                original_risk
            ));
        }
        md.push('\n');
    }

    std::fs::write(path, md)?;
    Ok(())
}

fn markdown_link(summary: &PrSummary) -> String {
    let title = summary.title.replace('|', "\\|");
    if summary.url.is_empty() {
        format!("#{} {}", summary.number, title)
    } else {
        format!("[#{}]({}) {}", summary.number, summary.url, title)
    }
}

/// Helper to colorize a risk level string for terminal output.
fn colorize_risk(level: RiskLevel) -> colored::ColoredString {
    match level {
        RiskLevel::High => "HIGH".red().bold(),
        RiskLevel::Medium => "MEDIUM".yellow().bold(),
        RiskLevel::Low => "LOW".green().bold(),
    }
}
