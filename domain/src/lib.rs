//! Domain layer for pr-review
//!
//! This crate contains the contracts and rules of the review pipeline.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Tools and Prompts
//!
//! A provider exposes named **tools** (typed request → structured result, may
//! have side effects) and **prompts** (typed request → rendered messages,
//! pure). Both are declared with [`Schema`]s that are enforced on every call.
//!
//! ## Review Run
//!
//! The orchestrator walks a fixed [`RunState`] pipeline: connect, fetch PR
//! data, post the rendered [`ReviewTemplate`], done. Any failure is terminal.

pub mod core;
pub mod review;
pub mod run;
pub mod tool;

// Re-export commonly used types
pub use crate::core::error::RegistrationError;
pub use review::{
    ANALYZE_PR, GET_PR_DATA, MAX_COMMENT_LENGTH, POST_PR_COMMENT, PostedComment, PrRef,
    PullRequestData, ReviewTemplate,
};
pub use run::{FailureReason, InvalidTransition, RunState};
pub use tool::{
    CallError, Constraint, FieldSpec, FieldType, FieldViolation, MessageContent, PromptDefinition,
    PromptMessage, PromptRenderer, Role, Schema, TargetKind, ToolDefinition, ToolError,
    ToolHandler, ValidatedArgs,
};
