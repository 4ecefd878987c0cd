//! Error types and JSON error envelopes for crm-api

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crm_hubspot::HubSpotError;
use serde_json::{json, Value as JsonValue};
use thiserror::Error;
use tracing::error;

/// Single-resource lookups with a dedicated not-found answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Contact,
    Deal,
}

impl Resource {
    pub fn not_found_message(&self) -> &'static str {
        match self {
            Self::Contact => "Contact not found",
            Self::Deal => "Deal not found",
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Contact => "Would you like to create a new contact?",
            Self::Deal => "Would you like to create a new deal?",
        }
    }
}

/// crm-api error type
#[derive(Error, Debug)]
pub enum ApiError {
    /// HubSpot call failed while serving the route described by `context`
    #[error("{context}: {source}")]
    HubSpot {
        context: &'static str,
        #[source]
        source: HubSpotError,
    },

    #[error("{}", .0.not_found_message())]
    NotFound(Resource),

    #[error("{error}: {details}")]
    BadRequest { error: String, details: String },

    #[error("AI processing failed: {0}")]
    Assistant(#[from] crm_core::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Forced shutdown after {0}s")]
    ForcedShutdown(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Wrap a HubSpot failure for the route described by `context`
    pub fn hubspot(context: &'static str) -> impl FnOnce(HubSpotError) -> Self {
        move |source| Self::HubSpot { context, source }
    }

    /// Like [`ApiError::hubspot`], with HubSpot 404s turned into the not-found envelope
    pub fn lookup(context: &'static str, resource: Resource) -> impl FnOnce(HubSpotError) -> Self {
        move |source| {
            if source.is_not_found() {
                Self::NotFound(resource)
            } else {
                Self::HubSpot { context, source }
            }
        }
    }

    /// Missing required top-level body field
    pub fn missing_field(context: &str, field: &str) -> Self {
        Self::BadRequest {
            error: context.to_string(),
            details: format!("Missing required field '{}'", field),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::HubSpot { source, .. } => source
                .status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Assistant(_) | Self::Internal(_) | Self::ForcedShutdown(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON body sent to the client
    pub fn body(&self) -> JsonValue {
        match self {
            Self::HubSpot { context, source } => json!({
                "error": context,
                "details": source.details(),
            }),
            Self::NotFound(resource) => json!({
                "notFound": true,
                "message": resource.not_found_message(),
                "suggestion": resource.suggestion(),
            }),
            Self::BadRequest { error, details } => json!({
                "error": error,
                "details": details,
            }),
            Self::Assistant(e) => json!({
                "error": "AI processing failed",
                "details": e.details(),
            }),
            other => json!({
                "error": "Internal server error",
                "details": other.to_string(),
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        if status.is_server_error() {
            error!("{} ({}): {}", body["error"], status, body["details"]);
        } else {
            tracing::warn!("{} ({}): {}", self, status, body);
        }
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest {
            error: "Invalid request body".to_string(),
            details: rejection.body_text(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;
