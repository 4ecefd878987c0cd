//! LLM API client and types
//!
//! Speaks the OpenAI-compatible chat-completions protocol, including
//! function tool calls.

mod client;
mod types;

pub use client::LlmClient;
pub use types::*;
