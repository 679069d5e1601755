//! Raw TOML configuration data types
//!
//! ```toml
//! [provider]
//! command = "pr-review-provider"
//! args = []
//!
//! [session]
//! handshake_timeout_secs = 10
//! call_timeout_secs = 60
//!
//! [github]
//! api_url = "https://github.example.com/api/v3"
//!
//! [transcript]
//! path = "pr-review-transcript.jsonl"
//! ```

use pr_review_application::SessionParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("session.{0} cannot be 0")]
    InvalidTimeout(&'static str),

    #[error("provider.command cannot be empty")]
    EmptyProviderCommand,

    #[error("github.api_url must be an http(s) URL, got '{0}'")]
    InvalidApiUrl(String),
}

/// How to launch the provider process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Provider executable; defaults to the sibling `pr-review-provider` binary
    pub command: Option<String>,
    pub args: Vec<String>,
}

/// Session bounds in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSessionConfig {
    pub handshake_timeout_secs: u64,
    pub call_timeout_secs: u64,
}

impl Default for FileSessionConfig {
    fn default() -> Self {
        let params = SessionParams::default();
        Self {
            handshake_timeout_secs: params.handshake_timeout.as_secs(),
            call_timeout_secs: params.call_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGitHubConfig {
    /// API root; `None` means public GitHub
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTranscriptConfig {
    /// JSONL call transcript; disabled when unset
    pub path: Option<PathBuf>,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub provider: FileProviderConfig,
    pub session: FileSessionConfig,
    pub github: FileGitHubConfig,
    pub transcript: FileTranscriptConfig,
}

impl FileConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.session.handshake_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout("handshake_timeout_secs"));
        }
        if self.session.call_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout("call_timeout_secs"));
        }
        if let Some(command) = &self.provider.command
            && command.trim().is_empty()
        {
            return Err(ConfigValidationError::EmptyProviderCommand);
        }
        if let Some(url) = &self.github.api_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigValidationError::InvalidApiUrl(url.clone()));
        }
        Ok(())
    }

    pub fn session_params(&self) -> SessionParams {
        SessionParams::default()
            .with_handshake_timeout(Duration::from_secs(self.session.handshake_timeout_secs))
            .with_call_timeout(Duration::from_secs(self.session.call_timeout_secs))
    }
}
