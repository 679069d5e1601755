//! Review run lifecycle

pub mod state;

pub use state::{FailureReason, InvalidTransition, RunState};
