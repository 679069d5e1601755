//! Infrastructure layer for pr-review
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the wire protocol and client session, the
//! provider registry and server loop, GitHub REST collaborators,
//! configuration file loading and the JSONL call transcript.

pub mod config;
pub mod connector;
pub mod github;
pub mod logging;
pub mod protocol;
pub mod provider;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use connector::StdioSessionConnector;
pub use github::GitHubClient;
pub use logging::JsonlTranscriptLogger;
pub use protocol::{
    ClientSession, ProtocolError, ProviderCommand, ProviderServer, Transport,
    error::Result,
};
pub use provider::{ToolProvider, build_pr_review_provider};
