//! Conversational tool router
//!
//! One user turn costs at most two model round-trips:
//!
//! 1. the system prompt, the client-supplied history and every registered
//!    tool go to the model with `tool_choice: "auto"`;
//! 2. a reply without tool calls is returned as-is;
//! 3. otherwise the first requested call is executed through the
//!    [`ToolManager`];
//! 4. the assistant message and a tool-role message carrying the JSON result
//!    are appended, and the model is asked again without tools. That reply
//!    is the answer.
//!
//! Any failure along the way aborts the turn. There is no retry and no
//! partial answer.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::llm::{ChatMessage, LlmClient, ToolRequest};
use crate::tool::ToolManager;

/// Outcome of one conversational turn
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    /// Final text from the model (the provider may send none)
    pub content: Option<String>,
    /// Name of the tool that ran during the turn
    pub tool_used: Option<String>,
    /// Number of model requests made
    pub model_calls: usize,
}

/// Chat assistant that can act on the CRM through tools
pub struct Assistant {
    client: LlmClient,
    tools: Arc<ToolManager>,
    system_prompt: String,
}

impl Assistant {
    pub fn new(client: LlmClient, tools: Arc<ToolManager>, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            tools,
            system_prompt: system_prompt.into(),
        }
    }

    /// Registered tools
    pub fn tools(&self) -> &ToolManager {
        &self.tools
    }

    /// Answer the latest turn of `history`
    pub async fn respond(&self, history: Vec<ChatMessage>) -> Result<AssistantReply> {
        let mut messages = Vec::with_capacity(history.len() + 3);
        messages.push(ChatMessage::system(&self.system_prompt));
        messages.extend(history);

        debug!("Assistant turn with {} messages", messages.len());

        let request = self
            .client
            .request_builder()
            .messages(messages.iter().cloned())
            .tools(self.tools.definitions())
            .build();
        let mut message = self.client.chat(&request).await?.into_message()?;

        let tool_request = message.tool_request();
        if let ToolRequest::Multiple { first, ignored } = tool_request {
            warn!(
                tool = %first.function.name,
                ignored,
                "Model requested several tool calls; only the first is executed"
            );
        }
        let Some(call) = tool_request.call().cloned() else {
            return Ok(AssistantReply {
                content: message.content,
                tool_used: None,
                model_calls: 1,
            });
        };
        message.retain_first_tool_call();

        let input = call.parse_arguments()?;
        info!(tool = %call.function.name, "Executing tool: {}", input);

        let result = self.tools.execute(&call.function.name, input).await?;

        messages.push(message);
        messages.push(ChatMessage::tool(call.id.clone(), result.output));

        let request = self.client.request_builder().messages(messages).build();
        let final_message = self.client.chat(&request).await?.into_message()?;

        Ok(AssistantReply {
            content: final_message.content,
            tool_used: Some(call.function.name),
            model_calls: 2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::error::Error;
    use crate::llm::Role;
    use crate::tool::{Tool, ToolResult};
    use async_trait::async_trait;
    use serde_json::{json, Value as JsonValue};
    use std::sync::Mutex;
    use wiremock::matchers::{body_partial_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct RecordingTool {
        name: &'static str,
        output: JsonValue,
        calls: Arc<Mutex<Vec<JsonValue>>>,
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "records its input"
        }

        fn input_schema(&self) -> JsonValue {
            json!({"type": "object", "properties": {"action": {"type": "string"}}})
        }

        async fn execute(&self, input: JsonValue) -> Result<ToolResult> {
            self.calls.lock().unwrap().push(input);
            Ok(ToolResult::json(&self.output))
        }
    }

    fn completion(message: JsonValue, finish_reason: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-test",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": message, "finish_reason": finish_reason}]
        }))
    }

    fn tool_call(id: &str, name: &str, arguments: JsonValue) -> JsonValue {
        json!({
            "id": id,
            "type": "function",
            "function": {"name": name, "arguments": arguments.to_string()}
        })
    }

    fn assistant_for(server: &MockServer, tools: ToolManager) -> Assistant {
        let config = LlmConfig {
            api_key: "sk-test".to_string(),
            ..LlmConfig::default()
        };
        let client = LlmClient::with_base_url(&config, server.uri()).unwrap();
        Assistant::new(client, Arc::new(tools), "You manage a CRM.")
    }

    fn deals_tool(calls: &Arc<Mutex<Vec<JsonValue>>>) -> ToolManager {
        let mut tools = ToolManager::new();
        tools.register(Arc::new(RecordingTool {
            name: "DealsTool",
            output: json!({"id": "42", "properties": {"dealname": "Pro Plan", "amount": "99"}}),
            calls: Arc::clone(calls),
        }));
        tools
    }

    async fn request_bodies(server: &MockServer) -> Vec<JsonValue> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_plain_reply_uses_one_model_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"tool_choice": "auto"})))
            .respond_with(completion(
                json!({"role": "assistant", "content": "Hi! How can I help?"}),
                "stop",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let calls = Arc::new(Mutex::new(Vec::new()));
        let assistant = assistant_for(&server, deals_tool(&calls));
        let reply = assistant
            .respond(vec![ChatMessage::user("hello")])
            .await
            .unwrap();

        assert_eq!(reply.content.as_deref(), Some("Hi! How can I help?"));
        assert_eq!(reply.model_calls, 1);
        assert!(reply.tool_used.is_none());
        assert!(calls.lock().unwrap().is_empty());

        let bodies = request_bodies(&server).await;
        assert_eq!(bodies[0]["messages"][0]["role"], "system");
        assert_eq!(bodies[0]["messages"][0]["content"], "You manage a CRM.");
        assert_eq!(bodies[0]["messages"][1]["content"], "hello");
        assert_eq!(bodies[0]["tools"][0]["function"]["name"], "DealsTool");
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"tool_choice": "auto"})))
            .respond_with(completion(
                json!({
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [tool_call("call_1", "DealsTool", json!({"action": "getDealById", "dealId": "42"}))]
                }),
                "tool_calls",
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("tool_call_id"))
            .respond_with(completion(
                json!({"role": "assistant", "content": "Deal Pro Plan is worth 99."}),
                "stop",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let calls = Arc::new(Mutex::new(Vec::new()));
        let assistant = assistant_for(&server, deals_tool(&calls));
        let reply = assistant
            .respond(vec![ChatMessage::user("show deal 42")])
            .await
            .unwrap();

        assert_eq!(reply.content.as_deref(), Some("Deal Pro Plan is worth 99."));
        assert_eq!(reply.tool_used.as_deref(), Some("DealsTool"));
        assert_eq!(reply.model_calls, 2);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![json!({"action": "getDealById", "dealId": "42"})]
        );

        let bodies = request_bodies(&server).await;
        let second = &bodies[1];
        assert!(second.get("tools").is_none());
        let messages = second["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        let tool_payload: JsonValue =
            serde_json::from_str(messages[3]["content"].as_str().unwrap()).unwrap();
        assert_eq!(tool_payload["properties"]["dealname"], "Pro Plan");
    }

    #[tokio::test]
    async fn test_only_first_of_several_tool_calls_runs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"tool_choice": "auto"})))
            .respond_with(completion(
                json!({
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        tool_call("call_1", "DealsTool", json!({"action": "getDealById", "dealId": "1"})),
                        tool_call("call_2", "DealsTool", json!({"action": "getDealById", "dealId": "2"}))
                    ]
                }),
                "tool_calls",
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("tool_call_id"))
            .respond_with(completion(
                json!({"role": "assistant", "content": "Here is deal 1."}),
                "stop",
            ))
            .mount(&server)
            .await;

        let calls = Arc::new(Mutex::new(Vec::new()));
        let assistant = assistant_for(&server, deals_tool(&calls));
        let reply = assistant
            .respond(vec![ChatMessage::user("show deals 1 and 2")])
            .await
            .unwrap();

        assert_eq!(reply.content.as_deref(), Some("Here is deal 1."));
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(calls.lock().unwrap()[0]["dealId"], "1");

        let bodies = request_bodies(&server).await;
        let echoed = &bodies[1]["messages"][2];
        assert_eq!(echoed["tool_calls"].as_array().unwrap().len(), 1);
        assert_eq!(echoed["tool_calls"][0]["id"], "call_1");
    }

    #[tokio::test]
    async fn test_unknown_tool_aborts_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"tool_choice": "auto"})))
            .respond_with(completion(
                json!({
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [tool_call("call_1", "InvoicesTool", json!({"action": "list"}))]
                }),
                "tool_calls",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let calls = Arc::new(Mutex::new(Vec::new()));
        let assistant = assistant_for(&server, deals_tool(&calls));
        let err = assistant
            .respond(vec![ChatMessage::user("list invoices")])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ToolExecution(msg) if msg.contains("InvoicesTool")));
        assert_eq!(request_bodies(&server).await.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let calls = Arc::new(Mutex::new(Vec::new()));
        let assistant = assistant_for(&server, deals_tool(&calls));
        let err = assistant
            .respond(vec![ChatMessage::user("hello")])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::LlmApi { status: 500, .. }));
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "ContactsTool"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn input_schema(&self) -> JsonValue {
            json!({"type": "object"})
        }

        async fn execute(&self, _input: JsonValue) -> Result<ToolResult> {
            Err(Error::Gateway {
                status: 502,
                body: "upstream unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_tool_failure_aborts_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"tool_choice": "auto"})))
            .respond_with(completion(
                json!({
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [tool_call("call_1", "ContactsTool", json!({"action": "getAllContacts"}))]
                }),
                "tool_calls",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut tools = ToolManager::new();
        tools.register(Arc::new(FailingTool));
        let err = assistant_for(&server, tools)
            .respond(vec![ChatMessage::user("list contacts")])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Gateway { status: 502, .. }));
        assert_eq!(request_bodies(&server).await.len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_forwarded_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(completion(
                json!({"role": "assistant", "content": "You have two contacts."}),
                "stop",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let calls = Arc::new(Mutex::new(Vec::new()));
        let assistant = assistant_for(&server, deals_tool(&calls));
        let history = vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
            ChatMessage::user("list contacts"),
        ];
        let expected_roles: Vec<Role> = history.iter().map(|m| m.role).collect();
        assistant.respond(history).await.unwrap();

        let bodies = request_bodies(&server).await;
        let messages = bodies[0]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");

        let sent: Vec<(Role, &str)> = messages[1..]
            .iter()
            .map(|m| {
                let role: Role = serde_json::from_value(m["role"].clone()).unwrap();
                (role, m["content"].as_str().unwrap())
            })
            .collect();
        assert_eq!(
            sent,
            vec![
                (expected_roles[0], "hi"),
                (expected_roles[1], "hello"),
                (expected_roles[2], "list contacts"),
            ]
        );
        assert_eq!(messages[2]["role"], "assistant");
    }
}
