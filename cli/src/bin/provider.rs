//! pr-review-provider: serves the PR review tools over stdio
//!
//! stdout carries protocol frames only; all logging goes to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use pr_review_infrastructure::{GitHubClient, ProviderServer, build_pr_review_provider};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI arguments for pr-review-provider
#[derive(Parser, Debug)]
#[command(name = "pr-review-provider")]
#[command(author, version, about = "Tool provider for pr-review (JSON-RPC over stdio)")]
struct ProviderCli {
    /// Token for the GitHub REST API
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", value_name = "URL")]
    github_api_url: Option<String>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ProviderCli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let mut client = GitHubClient::new(cli.github_token).context("Cannot build GitHub client")?;
    if let Some(url) = cli.github_api_url.filter(|u| !u.is_empty()) {
        client = client.with_base_url(url);
    }
    info!("Using GitHub API at {}", client.base_url());

    let client = Arc::new(client);
    let provider = build_pr_review_provider(client.clone(), client)?;
    let server = ProviderServer::new(Arc::new(provider));

    server
        .serve(tokio::io::stdin(), tokio::io::stdout())
        .await
        .context("Provider session ended with an error")?;

    info!("Orchestrator closed the session");
    Ok(())
}
