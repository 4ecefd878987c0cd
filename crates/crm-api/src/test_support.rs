//! Shared fixtures for router tests

use std::sync::Arc;

use crm_core::{Assistant, HubSpotConfig, LlmClient, LlmConfig, ToolManager};
use crm_hubspot::HubSpotClient;
use crm_tools::{register_crm_tools, GatewayClient};
use serde_json::{json, Value as JsonValue};
use wiremock::ResponseTemplate;

use crate::server::AppState;

/// State wired to mock HubSpot and model servers, tools pointed at `gateway_url`
pub fn app_state(hubspot_url: &str, llm_url: &str, gateway_url: &str) -> AppState {
    let hubspot = HubSpotClient::new(&HubSpotConfig {
        access_token: "pat-test".to_string(),
        base_url: hubspot_url.to_string(),
    })
    .unwrap();

    let llm = LlmClient::with_base_url(
        &LlmConfig {
            api_key: "sk-test".to_string(),
            ..LlmConfig::default()
        },
        llm_url,
    )
    .unwrap();

    let mut tools = ToolManager::new();
    register_crm_tools(&mut tools, GatewayClient::new(gateway_url).unwrap());

    AppState::new(
        hubspot,
        Assistant::new(llm, Arc::new(tools), "You are a CRM assistant."),
    )
}

/// Chat-completion answer carrying `message`
pub fn llm_completion(message: JsonValue) -> ResponseTemplate {
    let finish_reason = if message.get("tool_calls").is_some() {
        "tool_calls"
    } else {
        "stop"
    };
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-test",
        "model": "gpt-4o-mini",
        "choices": [{"index": 0, "message": message, "finish_reason": finish_reason}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
    }))
}
