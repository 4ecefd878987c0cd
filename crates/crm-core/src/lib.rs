//! crm-core: CRM assistant core library
//!
//! Configuration, the chat-completion client, the tool system and the
//! two-pass assistant that routes model tool calls to CRM tools.

pub mod assistant;
pub mod config;
pub mod error;
pub mod llm;
pub mod tool;

pub use assistant::{Assistant, AssistantReply};
pub use config::{ApiConfig, AssistantConfig, Config, HubSpotConfig, LlmConfig};
pub use error::{Error, Result};
pub use llm::{ChatMessage, LlmClient, Role, ToolDefinition};
pub use tool::{SchemaBuilder, Tool, ToolManager, ToolResult};
