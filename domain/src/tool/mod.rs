//! Tool domain module
//!
//! This module defines the contracts of the **tool-invocation protocol**: how
//! tools and prompts are declared, what a valid payload looks like, and how
//! failures are described.
//!
//! # Overview
//!
//! ```text
//! ┌────────────────┐   ┌────────────────┐   ┌────────────────┐
//! │ ToolDefinition │──▶│ ValidatedArgs  │──▶│ Value / Error  │
//! │ (in/out Schema)│   │ (input passed) │   │ (output check) │
//! └────────────────┘   └────────────────┘   └────────────────┘
//! ```
//!
//! - [`ToolDefinition`] / [`PromptDefinition`]: immutable declarations
//! - [`Schema`]: named, typed fields with constraints
//! - [`ToolHandler`] / [`PromptRenderer`]: implementations behind a name
//! - [`CallError`]: structured failure of a dispatched call
//!
//! # Architecture
//!
//! - **Domain** (this module): declarations and validation, no I/O
//! - **Application**: the tool session port used by the orchestrator
//! - **Infrastructure**: the provider registry, wire protocol, and GitHub
//!   handlers

pub mod entities;
pub mod handler;
pub mod schema;
pub mod value_objects;

pub use entities::{MessageContent, PromptDefinition, PromptMessage, Role, TargetKind, ToolDefinition};
pub use handler::{PromptRenderer, ToolHandler};
pub use schema::{Constraint, FieldSpec, FieldType, FieldViolation, Schema, ValidatedArgs};
pub use value_objects::{CallError, ToolError};
