//! Tool session port
//!
//! Defines how the orchestrator talks to a tool provider: open a session,
//! issue typed calls, close it. The concrete session (JSON-RPC framing over a
//! child process's stdio) lives in the infrastructure layer.

use async_trait::async_trait;
use pr_review_domain::{CallError, PromptMessage};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a tool session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Peer did not answer the handshake in time or is incompatible
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// No response within the configured bound; the call was abandoned
    #[error("Call '{name}' timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    /// The transport closed while the call was pending (or before it was sent)
    #[error("Session closed")]
    Closed,

    /// The provider answered with a structured failure
    #[error(transparent)]
    Call(#[from] CallError),

    /// Reading or writing the transport failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The peer sent something that is not a valid protocol message
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    /// The provider-side failure, if that is what this is
    pub fn call_error(&self) -> Option<&CallError> {
        match self {
            SessionError::Call(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SessionError::Closed)
    }
}

/// An open, handshaken session with a tool provider.
///
/// Calls may be issued concurrently; each resolves exactly once with its own
/// response, a timeout, or `Closed`.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Invoke a tool and return its structured content.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, SessionError>;

    /// Render a prompt and return its messages in order.
    async fn call_prompt(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<Vec<PromptMessage>, SessionError>;

    /// Close the transport. Pending calls resolve with [`SessionError::Closed`].
    async fn close(&self);
}

/// Opens sessions. One call to `connect` per review run.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ToolSession>, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_error_is_transparent() {
        let err: SessionError = CallError::unknown_tool("nope").into();
        assert_eq!(err.to_string(), "Unknown tool: nope");
        assert!(err.call_error().is_some());
    }

    #[test]
    fn test_timeout_display() {
        let err = SessionError::Timeout {
            name: "get_pr_data".into(),
            timeout: Duration::from_secs(5),
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Call 'get_pr_data' timed out after 5s");
    }
}
