//! CLI command definitions

use clap::{Parser, ValueEnum};
use pr_review_infrastructure::FileConfig;
use std::path::PathBuf;

/// Output format for the review result
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// One human-readable line
    Text,
    /// JSON object with the posted comment
    Json,
}

/// CLI arguments for pr-review
#[derive(Parser, Debug)]
#[command(name = "pr-review")]
#[command(author, version, about = "Post an automated review comment on a pull request")]
#[command(long_about = r#"
pr-review launches the pr-review-provider tool server, fetches the pull
request through its get_pr_data tool, renders a review comment and posts it
with post_pr_comment.

Launch inputs are usually provided by the CI environment:
  GITHUB_REPOSITORY   owner/repo
  PR_NUMBER           pull request number
  GITHUB_TOKEN        token forwarded to the provider

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./pr-review.toml    Project-level config
3. ~/.config/pr-review/config.toml   Global config

Example:
  GITHUB_REPOSITORY=octo/hello PR_NUMBER=42 pr-review -v
  pr-review --repository octo/hello --pr-number 42 --transcript calls.jsonl
"#)]
pub struct Cli {
    /// Repository as owner/repo
    #[arg(long, env = "GITHUB_REPOSITORY", value_name = "OWNER/REPO")]
    pub repository: Option<String>,

    /// Pull request number
    #[arg(long, env = "PR_NUMBER", value_name = "N")]
    pub pr_number: Option<String>,

    /// Token forwarded to the provider process
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub API base URL (overrides github.api_url)
    #[arg(long, env = "GITHUB_API_URL", value_name = "URL")]
    pub github_api_url: Option<String>,

    /// Provider executable (overrides provider.command)
    #[arg(long, value_name = "PATH")]
    pub provider_command: Option<String>,

    /// Extra provider argument (can be specified multiple times)
    #[arg(long = "provider-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub provider_args: Vec<String>,

    /// Handshake timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub handshake_timeout: Option<u64>,

    /// Per-call timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub call_timeout: Option<u64>,

    /// Append a JSONL call transcript to this file
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress lines
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded file config.
    pub fn apply_overrides(&self, config: &mut FileConfig) {
        if let Some(command) = &self.provider_command {
            config.provider.command = Some(command.clone());
        }
        if !self.provider_args.is_empty() {
            config.provider.args = self.provider_args.clone();
        }
        if let Some(secs) = self.handshake_timeout {
            config.session.handshake_timeout_secs = secs;
        }
        if let Some(secs) = self.call_timeout {
            config.session.call_timeout_secs = secs;
        }
        if let Some(url) = &self.github_api_url {
            config.github.api_url = Some(url.clone());
        }
        if let Some(path) = &self.transcript {
            config.transcript.path = Some(path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pr-review").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_file_values() {
        let cli = parse(&[
            "--repository",
            "octo/hello",
            "--pr-number",
            "42",
            "--call-timeout",
            "5",
            "--provider-command",
            "/opt/provider",
            "--provider-arg",
            "-vv",
            "--transcript",
            "calls.jsonl",
        ]);
        let mut config = FileConfig::default();
        config.session.call_timeout_secs = 90;
        config.provider.command = Some("from-file".into());

        cli.apply_overrides(&mut config);

        assert_eq!(config.session.call_timeout_secs, 5);
        assert_eq!(config.session.handshake_timeout_secs, 10);
        assert_eq!(config.provider.command.as_deref(), Some("/opt/provider"));
        assert_eq!(config.provider.args, vec!["-vv"]);
        assert_eq!(config.transcript.path, Some(PathBuf::from("calls.jsonl")));
    }

    #[test]
    fn test_file_values_kept_without_flags() {
        let cli = parse(&["--repository", "octo/hello", "--pr-number", "42"]);
        let mut config = FileConfig::default();
        config.github.api_url = Some("http://ghe.local/api/v3".into());
        config.provider.args = vec!["--flag".into()];

        cli.apply_overrides(&mut config);

        if std::env::var_os("GITHUB_API_URL").is_none() {
            assert_eq!(config.github.api_url.as_deref(), Some("http://ghe.local/api/v3"));
        }
        assert_eq!(config.provider.args, vec!["--flag"]);
    }

    #[test]
    fn test_verbosity_count() {
        let cli = parse(&["-vvv", "--quiet"]);
        assert_eq!(cli.verbose, 3);
        assert!(cli.quiet);
    }
}
