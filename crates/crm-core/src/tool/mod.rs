//! Tool system for chat-model function calls
//!
//! This module provides the tool system for executing the tools
//! the model asks for.

pub mod definition;
pub mod manager;
pub mod traits;

pub use definition::{SchemaBuilder, ToolDefinition};
pub use manager::ToolManager;
pub use traits::{Tool, ToolResult};
