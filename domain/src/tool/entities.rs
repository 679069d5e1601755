//! Tool domain entities

use serde::{Deserialize, Serialize};

use super::schema::Schema;

/// Which registry a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Tool,
    Prompt,
}

impl TargetKind {
    pub fn as_str(&self) -> &str {
        match self {
            TargetKind::Tool => "tool",
            TargetKind::Prompt => "prompt",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declaration of a side-effecting operation with typed input and output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    /// Unique name within a provider (e.g., "get_pr_data")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Contract for call arguments
    pub input: Schema,
    /// Contract for the handler's structured result
    pub output: Schema,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input: Schema::new(),
            output: Schema::new(),
        }
    }

    pub fn with_input(mut self, input: Schema) -> Self {
        self.input = input;
        self
    }

    pub fn with_output(mut self, output: Schema) -> Self {
        self.output = output;
        self
    }
}

/// Declaration of a pure rendering operation producing messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptDefinition {
    pub name: String,
    pub description: String,
    pub input: Schema,
}

impl PromptDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input: Schema::new(),
        }
    }

    pub fn with_input(mut self, input: Schema) -> Self {
        self.input = input;
        self
    }
}

/// Message author role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Message body. Only text is produced today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: String },
}

/// One rendered prompt message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl PromptMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text { text: text.into() },
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text { text: text.into() },
        }
    }

    pub fn text(&self) -> &str {
        match &self.content {
            MessageContent::Text { text } => text,
        }
    }
}
