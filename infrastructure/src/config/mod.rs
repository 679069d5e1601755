//! Configuration file loading for pr-review
//!
//! Merges built-in defaults, the XDG config file, a project file, an explicit
//! `--config` path and `PR_REVIEW_*` environment overrides. CLI flags are
//! applied on top by the binaries.

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileGitHubConfig, FileProviderConfig, FileSessionConfig,
    FileTranscriptConfig,
};
pub use loader::ConfigLoader;
