//! CLI entrypoint for pr-review
//!
//! This is the orchestrator binary: it wires the stdio connector, the
//! transcript logger and the review use case together using dependency
//! injection.

mod cli;
mod progress;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use cli::{Cli, OutputFormat};
use pr_review_application::{ReviewConfig, ReviewOutput, ReviewPullRequestUseCase};
use pr_review_infrastructure::{
    ConfigLoader, FileConfig, JsonlTranscriptLogger, ProviderCommand, StdioSessionConnector,
};
use progress::ProgressReporter;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const PROVIDER_BIN: &str = "pr-review-provider";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.show_config {
        print_config_sources();
        return Ok(());
    }

    let mut file_config = if cli.no_config {
        FileConfig::default()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    cli.apply_overrides(&mut file_config);
    file_config.validate()?;

    // Launch inputs are checked before any process is spawned
    let config =
        ReviewConfig::from_launch_inputs(cli.repository.as_deref(), cli.pr_number.as_deref())?
            .with_github_token(cli.github_token.clone())
            .with_session(file_config.session_params());

    info!("Starting pr-review for {}", config.pr());

    // === Dependency Injection ===
    let command = provider_command(&file_config, &config, cli.verbose)?;
    let mut connector = StdioSessionConnector::new(command, config.session().clone());
    if let Some(path) = &file_config.transcript.path {
        let logger = JsonlTranscriptLogger::open(path)
            .with_context(|| format!("Cannot open transcript {}", path.display()))?;
        connector = connector.with_transcript(Arc::new(logger));
    }

    let use_case = ReviewPullRequestUseCase::new(Arc::new(connector));

    let result = if cli.quiet {
        use_case.execute(&config).await
    } else {
        use_case
            .execute_with_progress(&config, &ProgressReporter)
            .await
    };

    match result {
        Ok(output) => {
            println!("{}", format_output(&output, cli.output));
            Ok(())
        }
        Err(failure) => {
            error!("{}: {}", failure, failure.error);
            Err(failure.into())
        }
    }
}

/// Provider launch command: explicit command, else the sibling binary.
fn provider_command(file: &FileConfig, config: &ReviewConfig, verbose: u8) -> Result<ProviderCommand> {
    let (program, mut args) = match &file.provider.command {
        Some(command) => (command.clone(), file.provider.args.clone()),
        None => {
            // Our own provider understands -v
            let mut args = file.provider.args.clone();
            if verbose > 0 {
                args.push(format!("-{}", "v".repeat(verbose as usize)));
            }
            (default_provider_path()?, args)
        }
    };
    args.retain(|a| !a.is_empty());

    let mut command = ProviderCommand::new(program).with_args(args);
    if let Some(token) = config.github_token() {
        command = command.with_env("GITHUB_TOKEN", token);
    }
    if let Some(url) = &file.github.api_url {
        command = command.with_env("GITHUB_API_URL", url.clone());
    }
    Ok(command)
}

fn default_provider_path() -> Result<String> {
    let exe = std::env::current_exe().context("Cannot locate the pr-review executable")?;
    let name = format!("{}{}", PROVIDER_BIN, std::env::consts::EXE_SUFFIX);
    Ok(exe.with_file_name(name).to_string_lossy().into_owned())
}

fn format_output(output: &ReviewOutput, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!(
            "Posted review comment {} on {}: {}",
            output.posted.comment_id, output.pr, output.posted.comment_url
        ),
        OutputFormat::Json => serde_json::json!({
            "pr": output.pr.to_string(),
            "title": output.data.title,
            "commentId": output.posted.comment_id,
            "commentUrl": output.posted.comment_url,
            "status": output.posted.status,
        })
        .to_string(),
    }
}

fn print_config_sources() {
    println!("Configuration sources (in priority order):");
    println!("  [     ] Env:     PR_REVIEW_* (e.g. PR_REVIEW_SESSION__CALL_TIMEOUT_SECS)");

    match ConfigLoader::project_config_path() {
        Some(path) => println!("  [FOUND] Project: {}", path.display()),
        None => println!("  [     ] Project: ./pr-review.toml or ./.pr-review.toml"),
    }

    if let Some(path) = ConfigLoader::global_config_path() {
        let mark = if path.exists() { "FOUND" } else { "     " };
        println!("  [{}] Global:  {}", mark, path.display());
    }

    println!("  [     ] Default: built-in defaults");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pr_review_domain::PrRef;

    fn review_config() -> ReviewConfig {
        ReviewConfig::new(PrRef::new("octo", "hello", 42)).with_github_token(Some("t0k".into()))
    }

    #[test]
    fn test_explicit_provider_command() {
        let mut file = FileConfig::default();
        file.provider.command = Some("/opt/provider".into());
        file.provider.args = vec!["--serve".into()];
        file.github.api_url = Some("http://ghe.local/api/v3".into());

        let command = provider_command(&file, &review_config(), 2).unwrap();

        assert_eq!(command.program, "/opt/provider");
        assert_eq!(command.args, vec!["--serve"]);
        assert!(command.env.contains(&("GITHUB_TOKEN".into(), "t0k".into())));
        assert!(
            command
                .env
                .contains(&("GITHUB_API_URL".into(), "http://ghe.local/api/v3".into()))
        );
    }

    #[test]
    fn test_default_provider_is_sibling_binary() {
        let command = provider_command(&FileConfig::default(), &review_config(), 2).unwrap();
        assert!(command.program.contains(PROVIDER_BIN));
        assert_eq!(command.args, vec!["-vv"]);
    }

    #[test]
    fn test_no_token_no_env() {
        let config = ReviewConfig::new(PrRef::new("octo", "hello", 42));
        let command = provider_command(&FileConfig::default(), &config, 0).unwrap();
        assert!(command.env.is_empty());
        assert!(command.args.is_empty());
    }
}
