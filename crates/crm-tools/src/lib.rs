//! crm-tools: CRM tools for the crm-gateway assistant
//!
//! `DealsTool` and `ContactsTool` translate model tool calls into requests
//! against the gateway's own `/api` endpoints.

use std::sync::Arc;

use crm_core::{Error, Result, ToolManager};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod contacts;
pub mod deals;
pub mod gateway;

pub use contacts::ContactsTool;
pub use deals::DealsTool;
pub use gateway::GatewayClient;

/// Register the CRM tools with the tool manager
pub fn register_crm_tools(manager: &mut ToolManager, gateway: GatewayClient) {
    manager.register(Arc::new(DealsTool::new(gateway.clone())));
    manager.register(Arc::new(ContactsTool::new(gateway)));
}

/// Decode `{"action": ..., ...}` tool arguments
pub(crate) fn parse_action<T: DeserializeOwned>(tool: &str, input: Value) -> Result<T> {
    serde_json::from_value(input)
        .map_err(|e| Error::ToolExecution(format!("Invalid {} arguments: {}", tool, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_crm_tools() {
        let mut manager = ToolManager::new();
        let gateway = GatewayClient::new("http://127.0.0.1:3001").unwrap();
        register_crm_tools(&mut manager, gateway);

        assert_eq!(manager.tool_names(), vec!["ContactsTool", "DealsTool"]);
        let definitions = manager.definitions();
        assert!(definitions.iter().all(|d| d.input_schema["required"] == serde_json::json!(["action"])));
    }
}
