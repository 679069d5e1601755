//! External collaborator ports
//!
//! The `get_pr_data` and `post_pr_comment` tool handlers reach GitHub only
//! through these two traits, so the provider can be exercised with fakes.
//!
//! - [`PrMetadataSource`]: title, body, diff URL and changed file paths
//! - [`CommentSink`]: creates an issue comment on the PR
//!
//! Failures keep the HTTP status so the handler can forward it unchanged.

use async_trait::async_trait;
use pr_review_domain::{PostedComment, PrRef, ToolError};
use thiserror::Error;

/// Errors reported by a collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized (status {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl CollaboratorError {
    pub fn status(&self) -> Option<u16> {
        match self {
            CollaboratorError::NotFound(_) => Some(404),
            CollaboratorError::Unauthorized { status, .. } | CollaboratorError::Http { status, .. } => {
                Some(*status)
            }
            CollaboratorError::Transport(_) | CollaboratorError::Decode(_) => None,
        }
    }
}

impl From<CollaboratorError> for ToolError {
    fn from(err: CollaboratorError) -> Self {
        let status = err.status();
        let tool_error = match &err {
            CollaboratorError::NotFound(resource) => ToolError::not_found(resource.clone()),
            CollaboratorError::Unauthorized { message, .. } => {
                ToolError::unauthorized(message.clone())
            }
            CollaboratorError::Http { .. }
            | CollaboratorError::Transport(_)
            | CollaboratorError::Decode(_) => ToolError::collaborator_failed(err.to_string()),
        };
        match status {
            Some(s) => tool_error.with_status(s),
            None => tool_error,
        }
    }
}

/// Pull request metadata as returned by the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestMetadata {
    pub title: String,
    pub body: Option<String>,
    pub diff_url: Option<String>,
    pub files: Vec<String>,
}

/// Collaborator A: reads pull request metadata
#[async_trait]
pub trait PrMetadataSource: Send + Sync {
    async fn fetch_pull_request(&self, pr: &PrRef) -> Result<PullRequestMetadata, CollaboratorError>;
}

/// Collaborator B: writes a comment on a pull request
///
/// Not idempotent: a retried or timed-out call may leave a duplicate comment.
#[async_trait]
pub trait CommentSink: Send + Sync {
    async fn create_comment(&self, pr: &PrRef, body: &str)
    -> Result<PostedComment, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_tool_error() {
        let err: ToolError = CollaboratorError::NotFound("octo/hello#9".into()).into();
        assert_eq!(err.code, "NOT_FOUND");
        assert_eq!(err.status, Some(404));
    }

    #[test]
    fn test_http_status_preserved() {
        let err: ToolError = CollaboratorError::Http {
            status: 422,
            message: "Validation Failed".into(),
        }
        .into();
        assert_eq!(err.code, "COLLABORATOR_FAILED");
        assert_eq!(err.status, Some(422));
        assert!(err.message.contains("Validation Failed"));
    }

    #[test]
    fn test_unauthorized_maps() {
        let err: ToolError = CollaboratorError::Unauthorized {
            status: 403,
            message: "Resource not accessible by integration".into(),
        }
        .into();
        assert_eq!(err.code, "UNAUTHORIZED");
        assert_eq!(err.status, Some(403));
    }

    #[test]
    fn test_transport_has_no_status() {
        let err = CollaboratorError::Transport("connection refused".into());
        assert_eq!(err.status(), None);
        let tool: ToolError = err.into();
        assert!(tool.status.is_none());
    }
}
