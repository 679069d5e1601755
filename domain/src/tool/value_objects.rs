//! Tool domain value objects - failure descriptors
//!
//! Two layers of failure exist:
//!
//! - [`ToolError`] is what a handler returns when its own work fails (the
//!   PR was not found, GitHub answered 403, ...). It keeps the collaborator's
//!   HTTP status for diagnostics.
//! - [`CallError`] is what a *dispatch* produces. It wraps `ToolError` and
//!   adds the provider-side outcomes: unknown target, caller validation
//!   failure, and handler contract violations.
//!
//! `CallError` is serializable so it can cross the transport intact; the
//! client rebuilds the same variant the provider produced.
//!
//! | Code | Produced by |
//! |------|-------------|
//! | `NOT_FOUND` | Collaborator 404 |
//! | `UNAUTHORIZED` | Collaborator 401 / 403 |
//! | `COLLABORATOR_FAILED` | Other non-2xx or transport failure |
//! | `INVALID_ARGUMENT` | Handler-side argument rejection |
//! | `EXECUTION_FAILED` | Any other handler failure |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::TargetKind;
use super::schema::{FieldViolation, format_violations};

/// Error that occurred inside a tool handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g., "NOT_FOUND", "UNAUTHORIZED")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// HTTP status reported by an external collaborator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            status: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    // Common error constructors
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            "NOT_FOUND",
            format!("Resource not found: {}", resource.into()),
        )
    }

    pub fn unauthorized(resource: impl Into<String>) -> Self {
        Self::new(
            "UNAUTHORIZED",
            format!("Not authorized: {}", resource.into()),
        )
    }

    pub fn collaborator_failed(message: impl Into<String>) -> Self {
        Self::new("COLLABORATOR_FAILED", message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("EXECUTION_FAILED", message)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(status) = self.status {
            write!(f, " (status {})", status)?;
        }
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Structured failure of a dispatched call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallError {
    /// No tool/prompt with that name is registered.
    #[error("Unknown {target}: {name}")]
    UnknownTarget { target: TargetKind, name: String },

    /// The caller's arguments do not satisfy the input schema.
    #[error("Invalid arguments for '{name}': {}", format_violations(.violations))]
    Validation {
        name: String,
        violations: Vec<FieldViolation>,
    },

    /// The handler broke its own declared contract. Always a programming defect.
    #[error("'{name}' violated its declared contract: {detail}")]
    ContractViolation {
        name: String,
        detail: String,
        #[serde(default)]
        violations: Vec<FieldViolation>,
    },

    /// The handler ran and reported a failure.
    #[error("'{name}' failed: {error}")]
    ToolFailed { name: String, error: ToolError },
}

impl CallError {
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTarget {
            target: TargetKind::Tool,
            name: name.into(),
        }
    }

    pub fn unknown_prompt(name: impl Into<String>) -> Self {
        Self::UnknownTarget {
            target: TargetKind::Prompt,
            name: name.into(),
        }
    }

    /// Field paths that caused a validation or contract failure.
    pub fn field_paths(&self) -> Vec<&str> {
        match self {
            CallError::Validation { violations, .. }
            | CallError::ContractViolation { violations, .. } => {
                violations.iter().map(|v| v.path.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Collaborator HTTP status, if the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            CallError::ToolFailed { error, .. } => error.status,
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CallError::Validation { .. })
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, CallError::ContractViolation { .. })
    }
}
