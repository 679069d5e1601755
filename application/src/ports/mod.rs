//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod collaborators;
pub mod progress;
pub mod tool_session;
pub mod transcript;
