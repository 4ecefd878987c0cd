//! HTTP API handlers
//!
//! Each CRM handler is a pass-through: check the minimal input, make the
//! HubSpot call(s), relay the JSON.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::{SecondsFormat, Utc};
use crm_core::ChatMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::error::{ApiError, Resource, Result};
use crate::server::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// `POST /api/contacts` body
#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    #[serde(default)]
    pub properties: Option<JsonValue>,
}

/// `POST /api/deals` body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealRequest {
    #[serde(default)]
    pub deal_properties: Option<JsonValue>,
    #[serde(default)]
    pub contact_id: Option<JsonValue>,
}

impl CreateDealRequest {
    /// Contact to associate; numbers are accepted, empty strings are not
    pub fn contact_id(&self) -> Option<String> {
        match self.contact_id.as_ref()? {
            JsonValue::String(id) if !id.is_empty() => Some(id.clone()),
            JsonValue::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// `POST /api/chat` body
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// `POST /api/chat` answer
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub content: Option<String>,
}

/// Present, non-null body field
fn required(value: Option<JsonValue>, context: &str, field: &str) -> Result<JsonValue> {
    match value {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(ApiError::missing_field(context, field)),
    }
}

// ============================================================================
// Handler functions
// ============================================================================

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Server is running",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// HubSpot account details
pub async fn account_info(State(state): State<AppState>) -> Result<Json<JsonValue>> {
    let info = state
        .hubspot
        .account_info()
        .await
        .map_err(ApiError::hubspot("Failed to fetch information"))?;
    Ok(Json(info))
}

pub async fn list_contacts(State(state): State<AppState>) -> Result<Json<JsonValue>> {
    let contacts = state
        .hubspot
        .list_contacts()
        .await
        .map_err(ApiError::hubspot("Failed to fetch contacts"))?;
    Ok(Json(contacts))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Path(contact_id): Path<String>,
) -> Result<Json<JsonValue>> {
    debug!("Fetching contact {}", contact_id);
    let contact = state
        .hubspot
        .get_contact(&contact_id)
        .await
        .map_err(ApiError::lookup("Failed to fetch contact", Resource::Contact))?;
    Ok(Json(contact))
}

pub async fn create_contact(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateContactRequest>, JsonRejection>,
) -> Result<Json<JsonValue>> {
    const CONTEXT: &str = "Failed to create contact";

    let Json(request) = payload?;
    let properties = required(request.properties, CONTEXT, "properties")?;

    let contact = state
        .hubspot
        .create_contact(properties)
        .await
        .map_err(ApiError::hubspot(CONTEXT))?;
    Ok(Json(contact))
}

pub async fn list_deals(State(state): State<AppState>) -> Result<Json<JsonValue>> {
    let deals = state
        .hubspot
        .list_deals()
        .await
        .map_err(ApiError::hubspot("Failed to fetch deals"))?;
    Ok(Json(deals))
}

pub async fn get_deal(
    State(state): State<AppState>,
    Path(deal_id): Path<String>,
) -> Result<Json<JsonValue>> {
    debug!("Fetching deal {}", deal_id);
    let deal = state
        .hubspot
        .get_deal(&deal_id)
        .await
        .map_err(ApiError::lookup("Failed to fetch deal", Resource::Deal))?;
    Ok(Json(deal))
}

/// Create a deal, optionally associated to `contactId`
pub async fn create_deal(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateDealRequest>, JsonRejection>,
) -> Result<Json<JsonValue>> {
    const CONTEXT: &str = "Failed to create deal";

    let Json(request) = payload?;
    let contact_id = request.contact_id();
    let properties = required(request.deal_properties, CONTEXT, "dealProperties")?;

    let deal = state
        .hubspot
        .create_deal(properties, contact_id.as_deref())
        .await
        .map_err(ApiError::hubspot(CONTEXT))?;
    Ok(Json(deal))
}

pub async fn contact_deals(
    State(state): State<AppState>,
    Path(contact_id): Path<String>,
) -> Result<Json<JsonValue>> {
    let deals = state
        .hubspot
        .deals_for_contact(&contact_id)
        .await
        .map_err(ApiError::hubspot("Failed to fetch deals for contact"))?;
    Ok(Json(deals))
}

pub async fn deal_contacts(
    State(state): State<AppState>,
    Path(deal_id): Path<String>,
) -> Result<Json<JsonValue>> {
    let contacts = state
        .hubspot
        .contacts_for_deal(&deal_id)
        .await
        .map_err(ApiError::hubspot("Failed to fetch contact for deals"))?;
    Ok(Json(contacts))
}

/// Chat endpoint: one assistant turn over the client-held history
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(request) = payload?;
    debug!("Chat request with {} messages", request.messages.len());

    let reply = state.assistant.respond(request.messages).await?;

    info!(
        tool = reply.tool_used.as_deref().unwrap_or("none"),
        model_calls = reply.model_calls,
        "Chat turn complete"
    );

    Ok(Json(ChatResponse {
        content: reply.content,
    }))
}
