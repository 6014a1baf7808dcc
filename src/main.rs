mod backport;
mod config;
mod github;
mod pr;
mod report;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;

use crate::backport::{BackportAggregator, OriginResolver};
use crate::github::GitHubClient;
use crate::pr::{PrReference, UrlResolver};

/// Backport Scout — finds the original PR behind each open backport and
/// ranks backports by risk for release triage.
#[derive(Parser, Debug)]
#[command(name = "backport-scout", version, about)]
struct Cli {
    /// Path to a config file (defaults to ./.backport-scout.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report open backports for one or more release lines
    Backports {
        /// Release lines such as 2.10 (targets the stable-2.10 branch)
        versions: Vec<String>,

        /// Optional output file path for markdown report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Guess the original PR of a single backport
    Origin {
        /// PR number, owner/repo#number, or pull request URL
        pr: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = match &cli.config {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load()?,
    };

    let client = Arc::new(GitHubClient::from_config(&config)?);
    let origins = OriginResolver::new(
        client.clone(),
        UrlResolver::new(config.default_repo()),
        config.search.orgs.clone(),
    );

    match cli.command {
        Command::Backports { versions, output } => {
            let versions = if versions.is_empty() {
                config.backports.versions.clone()
            } else {
                versions
            };
            let _span = info_span!("backports", versions = ?versions).entered();

            info!("collecting backports");
            let aggregator = BackportAggregator::new(origins, config.search.exclude_labels.clone());
            let collection = aggregator.collect(&versions).await?;
            info!(
                backports = collection.total(),
                max_risk = collection.max_risk(),
                max_original_risk = collection.max_original_risk(),
                "collection complete"
            );

            info!("generating report");
            let built_report = report::build(&collection);
            report::output(&built_report, output.as_deref())?;
        }
        Command::Origin { pr } => {
            let _span = info_span!("origin", pr = %pr).entered();
            let reference = PrReference::from(pr.as_str());

            info!("searching for the original PR");
            let candidates = origins.guess_original_ref(&reference).await?;
            info!(candidates = candidates.len(), "origin search complete");
            report::print_origin_candidates(&reference, &candidates);
        }
    }

    info!(api_calls = client.calls(), "done");
    Ok(())
}
