//! Application layer for pr-review
//!
//! This crate contains the review use case, port definitions, and application
//! configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{ConfigError, ReviewConfig, SessionParams};
pub use ports::{
    collaborators::{CollaboratorError, CommentSink, PrMetadataSource, PullRequestMetadata},
    progress::{NoProgress, ReviewProgress},
    tool_session::{SessionConnector, SessionError, ToolSession},
    transcript::{NoTranscript, TranscriptEvent, TranscriptLogger},
};
pub use use_cases::review_pr::{
    ReviewError, ReviewFailure, ReviewOutput, ReviewPullRequestUseCase,
};
