//! Domain error types

use thiserror::Error;

use crate::tool::entities::TargetKind;

/// Errors raised while building a provider's declaration set.
///
/// These are configuration errors: they surface at startup, never per call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: TargetKind, name: String },

    #[error("Invalid schema for {kind} '{name}': {reason}")]
    InvalidSchema {
        kind: TargetKind,
        name: String,
        reason: String,
    },
}

impl RegistrationError {
    /// Name of the declaration that was rejected
    pub fn name(&self) -> &str {
        match self {
            RegistrationError::DuplicateName { name, .. }
            | RegistrationError::InvalidSchema { name, .. } => name,
        }
    }
}
