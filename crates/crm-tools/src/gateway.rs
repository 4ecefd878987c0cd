//! Loopback client for the gateway's own REST endpoints
//!
//! Tools never talk to HubSpot directly; they go through `/api/...` so the
//! model sees exactly what a browser client would.

use crm_core::{Error, Result};
use reqwest::{Client, RequestBuilder, Url};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

/// HTTP client bound to the gateway base URL
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: Url,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid gateway URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("Invalid gateway URL '{}'", base_url)));
        }

        let client = Client::builder().build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Endpoint URL from percent-encoded segments; a final `""` segment
    /// produces a trailing slash
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Invalid gateway URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get(&self, segments: &[&str]) -> Result<JsonValue> {
        let url = self.url(segments)?;
        debug!("Gateway GET {}", url);
        self.send(self.client.get(url)).await
    }

    pub async fn post(&self, segments: &[&str], body: &JsonValue) -> Result<JsonValue> {
        let url = self.url(segments)?;
        debug!("Gateway POST {}", url);
        self.send(self.client.post(url).json(body)).await
    }

    /// 2xx bodies and `notFound` envelopes are results; anything else fails
    async fn send(&self, request: RequestBuilder) -> Result<JsonValue> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        if status.as_u16() == 404 {
            if let Ok(envelope) = serde_json::from_str::<JsonValue>(&body) {
                if envelope["notFound"] == JsonValue::Bool(true) {
                    info!("Gateway reported not found: {}", envelope["message"]);
                    return Ok(envelope);
                }
            }
        }

        warn!("Gateway error: {} - {}", status, body);
        Err(Error::Gateway {
            status: status.as_u16(),
            body,
        })
    }
}
