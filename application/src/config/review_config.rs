//! Review run configuration.
//!
//! [`ReviewConfig`] is built exactly once at process start from the launch
//! inputs (repository slug, PR number, token) and passed by reference into
//! the use case. Nothing below the orchestrator reads the environment.

use crate::config::SessionParams;
use pr_review_domain::PrRef;
use thiserror::Error;

/// Missing or malformed launch inputs. Reported before any session opens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required input: {0}")]
    Missing(&'static str),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Everything a review run needs.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pr: PrRef,
    github_token: Option<String>,
    session: SessionParams,
}

impl ReviewConfig {
    pub fn new(pr: PrRef) -> Self {
        Self {
            pr,
            github_token: None,
            session: SessionParams::default(),
        }
    }

    /// Build from raw launch inputs (`owner/repo` and PR number).
    pub fn from_launch_inputs(
        repository: Option<&str>,
        pr_number: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let repository = repository
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("repository (owner/repo)"))?;
        let pr_number = pr_number
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("pull request number"))?;

        let number = pr_number
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::Invalid {
                field: "pull request number",
                reason: format!("'{}' is not a positive integer", pr_number),
            })?;

        let pr = PrRef::parse(repository, number).map_err(|reason| ConfigError::Invalid {
            field: "repository",
            reason,
        })?;

        Ok(Self::new(pr))
    }

    // ==================== Builder Methods ====================

    pub fn with_github_token(mut self, token: Option<String>) -> Self {
        self.github_token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_session(mut self, session: SessionParams) -> Self {
        self.session = session;
        self
    }

    // ==================== Accessors ====================

    pub fn pr(&self) -> &PrRef {
        &self.pr
    }

    pub fn github_token(&self) -> Option<&str> {
        self.github_token.as_deref()
    }

    pub fn session(&self) -> &SessionParams {
        &self.session
    }
}
