//! Tool trait definition
//!
//! Defines the core trait for implementing tools the chat model can call.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::Result;

/// Tool execution result
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Output handed back to the model as the tool message content
    pub output: String,
}

impl ToolResult {
    /// Create a successful tool result
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }

    /// Create a successful result holding serialized JSON
    pub fn json(value: &JsonValue) -> Self {
        Self::success(value.to_string())
    }
}

/// Tool trait for chat-model function calls
///
/// Implement this trait to create tools that can be executed when the
/// model requests them.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name (used in the tool definitions sent to the model)
    fn name(&self) -> &str;

    /// Get the tool description (shown to the model when selecting tools)
    fn description(&self) -> &str;

    /// Get the JSON schema for the tool's input parameters
    fn input_schema(&self) -> JsonValue;

    /// Execute the tool with the given input
    ///
    /// # Arguments
    /// * `input` - JSON value containing the tool input parameters
    ///
    /// # Returns
    /// A `ToolResult` containing the output, or an error that aborts the turn
    async fn execute(&self, input: JsonValue) -> Result<ToolResult>;
}
