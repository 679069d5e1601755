//! Tool Provider registry
//!
//! The [`ToolProvider`] holds every tool and prompt declaration a provider
//! process serves, and is the single place where schemas are enforced:
//!
//! ```text
//! raw args ─▶ input schema ─▶ handler ─▶ output schema ─▶ structured content
//!               │ fail                      │ fail
//!               ▼                           ▼
//!        CallError::Validation     CallError::ContractViolation
//! ```
//!
//! Tools and prompts live in separate namespaces: a tool and a prompt may
//! share a name, two tools (or two prompts) may not.
//!
//! # Usage
//!
//! ```ignore
//! let mut provider = ToolProvider::new();
//! provider.register(definition, handler)?;
//! let content = provider.dispatch("get_pr_data", json!({...})).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use pr_review_domain::{
    CallError, PromptDefinition, PromptMessage, PromptRenderer, RegistrationError, TargetKind,
    ToolDefinition, ToolHandler,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::protocol::messages::{PromptArgument, PromptDescriptor, ToolDescriptor};

struct RegisteredTool {
    definition: ToolDefinition,
    handler: Arc<dyn ToolHandler>,
}

struct RegisteredPrompt {
    definition: PromptDefinition,
    renderer: Arc<dyn PromptRenderer>,
}

/// Registry of tools and prompts with schema enforcement at the boundary
#[derive(Default)]
pub struct ToolProvider {
    tools: HashMap<String, RegisteredTool>,
    prompts: HashMap<String, RegisteredPrompt>,
}

impl ToolProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// On error nothing changes; an earlier registration under the same name
    /// stays callable.
    pub fn register(
        &mut self,
        definition: ToolDefinition,
        handler: impl ToolHandler + 'static,
    ) -> Result<(), RegistrationError> {
        if self.tools.contains_key(&definition.name) {
            return Err(RegistrationError::DuplicateName {
                kind: TargetKind::Tool,
                name: definition.name,
            });
        }
        for (which, schema) in [("input", &definition.input), ("output", &definition.output)] {
            schema
                .check_well_formed()
                .map_err(|reason| RegistrationError::InvalidSchema {
                    kind: TargetKind::Tool,
                    name: definition.name.clone(),
                    reason: format!("{} schema: {}", which, reason),
                })?;
        }

        debug!("Registered tool '{}'", definition.name);
        self.tools.insert(
            definition.name.clone(),
            RegisteredTool {
                definition,
                handler: Arc::new(handler),
            },
        );
        Ok(())
    }

    /// Register a prompt. Same failure rules as [`register`](Self::register).
    pub fn register_prompt(
        &mut self,
        definition: PromptDefinition,
        renderer: impl PromptRenderer + 'static,
    ) -> Result<(), RegistrationError> {
        if self.prompts.contains_key(&definition.name) {
            return Err(RegistrationError::DuplicateName {
                kind: TargetKind::Prompt,
                name: definition.name,
            });
        }
        definition
            .input
            .check_well_formed()
            .map_err(|reason| RegistrationError::InvalidSchema {
                kind: TargetKind::Prompt,
                name: definition.name.clone(),
                reason: format!("input schema: {}", reason),
            })?;

        debug!("Registered prompt '{}'", definition.name);
        self.prompts.insert(
            definition.name.clone(),
            RegisteredPrompt {
                definition,
                renderer: Arc::new(renderer),
            },
        );
        Ok(())
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn has_prompt(&self, name: &str) -> bool {
        self.prompts.contains_key(name)
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name).map(|t| &t.definition)
    }

    /// Validate `arguments`, run the handler, validate its result.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<Value, CallError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| CallError::unknown_tool(name))?;

        let args = tool
            .definition
            .input
            .validate(&arguments)
            .map_err(|violations| CallError::Validation {
                name: name.to_string(),
                violations,
            })?;

        let handler = Arc::clone(&tool.handler);
        let output = handler
            .call(args)
            .await
            .map_err(|error| CallError::ToolFailed {
                name: name.to_string(),
                error,
            })?;

        match tool.definition.output.validate(&output) {
            Ok(validated) => Ok(validated.into_value()),
            Err(violations) => {
                warn!(
                    "Tool '{}' returned a result that violates its output schema",
                    name
                );
                Err(CallError::ContractViolation {
                    name: name.to_string(),
                    detail: "result does not match the declared output schema".into(),
                    violations,
                })
            }
        }
    }

    /// Validate `arguments` and render the prompt.
    pub fn render_prompt(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<Vec<PromptMessage>, CallError> {
        let prompt = self
            .prompts
            .get(name)
            .ok_or_else(|| CallError::unknown_prompt(name))?;

        let args = prompt
            .definition
            .input
            .validate(&arguments)
            .map_err(|violations| CallError::Validation {
                name: name.to_string(),
                violations,
            })?;

        let messages = prompt
            .renderer
            .render(&args)
            .map_err(|detail| CallError::ContractViolation {
                name: name.to_string(),
                detail,
                violations: Vec::new(),
            })?;

        if messages.is_empty() {
            return Err(CallError::ContractViolation {
                name: name.to_string(),
                detail: "rendered no messages".into(),
                violations: Vec::new(),
            });
        }
        Ok(messages)
    }

    /// Tool declarations sorted by name, schemas rendered as JSON Schema.
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        let mut tools: Vec<ToolDescriptor> = self
            .tools
            .values()
            .map(|t| ToolDescriptor {
                name: t.definition.name.clone(),
                description: t.definition.description.clone(),
                input_schema: t.definition.input.to_json_schema(),
                output_schema: t.definition.output.to_json_schema(),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Prompt declarations sorted by name.
    pub fn list_prompts(&self) -> Vec<PromptDescriptor> {
        let mut prompts: Vec<PromptDescriptor> = self
            .prompts
            .values()
            .map(|p| PromptDescriptor {
                name: p.definition.name.clone(),
                description: p.definition.description.clone(),
                arguments: p
                    .definition
                    .input
                    .fields()
                    .iter()
                    .map(|f| PromptArgument {
                        name: f.name.clone(),
                        description: f.description.clone(),
                        required: f.required,
                    })
                    .collect(),
            })
            .collect();
        prompts.sort_by(|a, b| a.name.cmp(&b.name));
        prompts
    }
}
