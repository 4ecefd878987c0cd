//! ContactsTool: create, read and inspect contacts through the gateway

use async_trait::async_trait;
use crm_core::{Result, SchemaBuilder, Tool, ToolResult};
use crm_hubspot::models::string_or_number;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::gateway::GatewayClient;
use crate::parse_action;

/// Contact operations offered to the model
pub struct ContactsTool {
    gateway: GatewayClient,
}

impl ContactsTool {
    pub fn new(gateway: GatewayClient) -> Self {
        Self { gateway }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum ContactsAction {
    #[serde(rename_all = "camelCase")]
    CreateContact { contact_properties: Value },
    #[serde(rename_all = "camelCase")]
    GetContactById {
        #[serde(deserialize_with = "string_or_number")]
        contact_id: String,
    },
    GetAllContacts,
    #[serde(rename_all = "camelCase")]
    GetContactAssociations {
        #[serde(deserialize_with = "string_or_number")]
        contact_id: String,
    },
}

#[async_trait]
impl Tool for ContactsTool {
    fn name(&self) -> &str {
        "ContactsTool"
    }

    fn description(&self) -> &str {
        "Create, read, and manage contacts and their associations in HubSpot-backed CRM."
    }

    fn input_schema(&self) -> Value {
        let contact_properties = SchemaBuilder::object_schema_with_descriptions(vec![
            ("firstname", "string", "Contact's first name", true),
            ("lastname", "string", "Contact's last name", true),
            ("email", "string", "Contact's email address", true),
            ("phone", "string", "Contact's phone number (optional)", false),
            ("company", "string", "Contact's company (optional)", false),
            ("address", "string", "Contact's address (optional)", false),
            ("jobtitle", "string", "Contact's job title (optional)", false),
        ]);

        json!({
            "type": "object",
            "properties": {
                "action": SchemaBuilder::describe(
                    SchemaBuilder::string_enum(vec![
                        "createContact",
                        "getContactById",
                        "getAllContacts",
                        "getContactAssociations",
                    ]),
                    "Action to perform:\n\
                     - createContact: Create a new contact (requires contactProperties)\n\
                     - getContactById: Fetch a specific contact (requires contactId)\n\
                     - getAllContacts: Fetch all contacts in the system\n\
                     - getContactAssociations: Get deals associated with a contact (requires contactId)"
                ),
                "contactProperties": SchemaBuilder::describe(
                    contact_properties,
                    "Properties required to create a contact (only for createContact action)"
                ),
                "contactId": {
                    "type": "string",
                    "description": "Contact ID for lookups or associations (required for getContactById and getContactAssociations)"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let action: ContactsAction = parse_action(self.name(), input)?;
        tracing::debug!(?action, "ContactsTool");

        let data = match action {
            ContactsAction::CreateContact { contact_properties } => {
                let body = json!({ "properties": contact_properties });
                self.gateway.post(&["api", "contacts"], &body).await?
            }
            ContactsAction::GetContactById { contact_id } => {
                self.gateway
                    .get(&["api", "contacts", &contact_id, ""])
                    .await?
            }
            ContactsAction::GetAllContacts => self.gateway.get(&["api", "contacts"]).await?,
            ContactsAction::GetContactAssociations { contact_id } => {
                self.gateway
                    .get(&["api", "contacts", &contact_id, "deals"])
                    .await?
            }
        };

        Ok(ToolResult::json(&data))
    }
}
