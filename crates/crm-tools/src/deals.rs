//! DealsTool: create and read deals through the gateway

use async_trait::async_trait;
use crm_core::{Result, SchemaBuilder, Tool, ToolResult};
use crm_hubspot::models::{optional_string_or_number, string_or_number};
use crm_hubspot::DealStage;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::gateway::GatewayClient;
use crate::parse_action;

/// Deal operations offered to the model
pub struct DealsTool {
    gateway: GatewayClient,
}

impl DealsTool {
    pub fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum DealsAction {
    #[serde(rename_all = "camelCase")]
    CreateDeal {
        deal_properties: Value,
        #[serde(default, deserialize_with = "optional_string_or_number")]
        contact_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    GetDealById {
        #[serde(deserialize_with = "string_or_number")]
        deal_id: String,
    },
    #[serde(rename_all = "camelCase")]
    GetDealsByContact {
        #[serde(deserialize_with = "string_or_number")]
        contact_id: String,
    },
}

#[async_trait]
impl Tool for DealsTool {
    fn name(&self) -> &str {
        "DealsTool"
    }

    fn description(&self) -> &str {
        "Create, read, and manage deals in HubSpot-backed CRM with contact associations."
    }

    fn input_schema(&self) -> Value {
        let stages: Vec<&str> = DealStage::ALL.iter().map(DealStage::as_str).collect();

        let mut deal_properties = SchemaBuilder::object_schema_with_descriptions(vec![
            ("dealname", "string", "Name of the deal", true),
            ("amount", "string", "Deal amount in currency", true),
            ("dealstage", "string", "Current stage of the deal", true),
            ("closedate", "string", "Expected close date (ISO format: YYYY-MM-DD, optional)", false),
            ("pipeline", "string", "Deal pipeline (optional, defaults to 'default')", false),
        ]);
        deal_properties["properties"]["dealstage"] = SchemaBuilder::describe(
            SchemaBuilder::string_enum(stages),
            "Current stage of the deal",
        );

        json!({
            "type": "object",
            "properties": {
                "action": SchemaBuilder::describe(
                    SchemaBuilder::string_enum(vec!["createDeal", "getDealById", "getDealsByContact"]),
                    "Action to perform:\n\
                     - createDeal: Create a new deal (requires dealProperties and optional contactId)\n\
                     - getDealById: Fetch a specific deal (requires dealId)\n\
                     - getDealsByContact: Get all deals associated with a contact (requires contactId)"
                ),
                "dealProperties": SchemaBuilder::describe(
                    deal_properties,
                    "Properties required to create a deal (only for createDeal action)"
                ),
                "contactId": {
                    "type": "string",
                    "description": "Contact ID to associate with the deal (optional for createDeal, required for getDealsByContact)"
                },
                "dealId": {
                    "type": "string",
                    "description": "Deal ID for lookups (required for getDealById)"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let action: DealsAction = parse_action(self.name(), input)?;
        tracing::debug!(?action, "DealsTool");

        let data = match action {
            DealsAction::CreateDeal {
                deal_properties,
                contact_id,
            } => {
                let mut body = json!({ "dealProperties": deal_properties });
                if let Some(contact_id) = contact_id.filter(|id| !id.is_empty()) {
                    body["contactId"] = json!(contact_id);
                }
                self.gateway.post(&["api", "deals"], &body).await?
            }
            DealsAction::GetDealById { deal_id } => {
                self.gateway.get(&["api", "deals", &deal_id, ""]).await?
            }
            DealsAction::GetDealsByContact { contact_id } => {
                self.gateway
                    .get(&["api", "contacts", &contact_id, "deals"])
                    .await?
            }
        };

        Ok(ToolResult::json(&data))
    }
}
