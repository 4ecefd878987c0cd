//! Error types for crm-hubspot

use serde_json::Value as JsonValue;
use thiserror::Error;

/// crm-hubspot error type
#[derive(Error, Debug)]
pub enum HubSpotError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-2xx answer from HubSpot; `body` is the JSON error document when
    /// the response parsed, the raw text otherwise
    #[error("HubSpot API error ({status}): {body}")]
    Api { status: u16, body: JsonValue },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HubSpotError {
    /// Build an API error from a raw response body
    pub fn api(status: u16, body: &str) -> Self {
        let body = serde_json::from_str(body).unwrap_or_else(|_| JsonValue::String(body.to_string()));
        Self::Api { status, body }
    }

    /// Upstream HTTP status, if HubSpot answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Configuration(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Error payload relayed to API clients
    pub fn details(&self) -> JsonValue {
        match self {
            Self::Api { body, .. } => body.clone(),
            other => JsonValue::String(other.to_string()),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, HubSpotError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_error_keeps_json_body() {
        let err = HubSpotError::api(404, r#"{"status":"error","message":"Object not found"}"#);
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
        assert_eq!(
            err.details(),
            json!({"status": "error", "message": "Object not found"})
        );
    }

    #[test]
    fn test_api_error_falls_back_to_text() {
        let err = HubSpotError::api(502, "Bad Gateway");
        assert!(!err.is_not_found());
        assert_eq!(err.details(), json!("Bad Gateway"));
    }

    #[test]
    fn test_configuration_error_has_no_status() {
        let err = HubSpotError::Configuration("HubSpot access token is empty".into());
        assert_eq!(err.status(), None);
        assert_eq!(
            err.details(),
            json!("Configuration error: HubSpot access token is empty")
        );
    }
}
