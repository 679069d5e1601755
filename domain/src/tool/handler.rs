//! Handler abstractions
//!
//! Registered tools are backed by a [`ToolHandler`]; registered prompts by a
//! [`PromptRenderer`]. Both receive [`ValidatedArgs`] only; the provider
//! validates before calling them and checks the result afterwards.

use async_trait::async_trait;
use serde_json::Value;

use super::entities::PromptMessage;
use super::schema::ValidatedArgs;
use super::value_objects::ToolError;

/// Side-effecting implementation of a tool.
///
/// The returned value is checked against the tool's output schema; a handler
/// that returns fields it did not declare (or omits required ones) produces a
/// contract violation rather than a success.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ValidatedArgs) -> Result<Value, ToolError>;
}

/// Pure rendering of a prompt.
///
/// Must be total over any input that satisfies the prompt's schema; an `Err`
/// here is treated as a registration bug.
pub trait PromptRenderer: Send + Sync {
    fn render(&self, args: &ValidatedArgs) -> Result<Vec<PromptMessage>, String>;
}

impl<F> PromptRenderer for F
where
    F: Fn(&ValidatedArgs) -> Result<Vec<PromptMessage>, String> + Send + Sync,
{
    fn render(&self, args: &ValidatedArgs) -> Result<Vec<PromptMessage>, String> {
        self(args)
    }
}
