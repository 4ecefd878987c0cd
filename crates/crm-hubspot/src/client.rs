//! HubSpot REST client
//!
//! Thin wrapper over the CRM v3 object API. Every call carries the private-app
//! token as a bearer credential and returns HubSpot's JSON untouched.

use crm_core::HubSpotConfig;
use reqwest::{Client, RequestBuilder, Url};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::error::{HubSpotError, Result};
use crate::models::{
    empty_results, AssociationList, BatchReadRequest, CreateObjectRequest, ObjectType,
    ASSOCIATED_CONTACT_PROPERTIES, DEAL_PROPERTIES, LIST_LIMIT,
};

/// HubSpot CRM client
#[derive(Clone)]
pub struct HubSpotClient {
    client: Client,
    base_url: Url,
    access_token: String,
}

impl HubSpotClient {
    /// Create a new HubSpot client
    pub fn new(config: &HubSpotConfig) -> Result<Self> {
        if config.access_token.is_empty() {
            return Err(HubSpotError::Configuration(
                "HubSpot access token is empty".to_string(),
            ));
        }

        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            HubSpotError::Configuration(format!("Invalid HubSpot base URL '{}': {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(HubSpotError::Configuration(format!(
                "Invalid HubSpot base URL '{}'",
                config.base_url
            )));
        }

        let client = Client::builder().build()?;

        info!("HubSpot client initialized for: {}", base_url);

        Ok(Self {
            client,
            base_url,
            access_token: config.access_token.clone(),
        })
    }

    /// Build an endpoint URL; each segment is percent-encoded on its own
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HubSpotError::Configuration(format!("Invalid HubSpot base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn object_url(&self, object: ObjectType, rest: &[&str]) -> Result<Url> {
        let mut segments = vec!["crm", "v3", "objects", object.as_str()];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    async fn send(&self, request: RequestBuilder) -> Result<JsonValue> {
        let response = request.bearer_auth(&self.access_token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("HubSpot API error: {} - {}", status, body);
            return Err(HubSpotError::api(status.as_u16(), &body));
        }

        Ok(response.json().await?)
    }

    async fn get(&self, url: Url, query: &[(&str, String)]) -> Result<JsonValue> {
        debug!("GET {}", url);
        self.send(self.client.get(url).query(query)).await
    }

    async fn post<T: Serialize + ?Sized>(&self, url: Url, body: &T) -> Result<JsonValue> {
        debug!("POST {}", url);
        self.send(self.client.post(url).json(body)).await
    }

    /// Account details for the token (`GET /integrations/v1/me`)
    pub async fn account_info(&self) -> Result<JsonValue> {
        let url = self.url(&["integrations", "v1", "me"])?;
        self.get(url, &[]).await
    }

    /// First page of objects with the standard property set
    pub async fn list_objects(&self, object: ObjectType) -> Result<JsonValue> {
        let url = self.object_url(object, &[])?;
        let query = [
            ("limit", LIST_LIMIT.to_string()),
            ("properties", object.properties().join(",")),
        ];
        let page = self.get(url, &query).await?;
        info!(
            "Fetched {} {}",
            page["results"].as_array().map(Vec::len).unwrap_or(0),
            object
        );
        Ok(page)
    }

    /// Single object by id
    pub async fn get_object(&self, object: ObjectType, id: &str) -> Result<JsonValue> {
        let url = self.object_url(object, &[id])?;
        let query = [("properties", object.properties().join(","))];
        self.get(url, &query).await
    }

    pub async fn create_object(
        &self,
        object: ObjectType,
        request: &CreateObjectRequest,
    ) -> Result<JsonValue> {
        let url = self.object_url(object, &[])?;
        let created = self.post(url, request).await?;
        info!(
            "Created {} object: {}",
            object,
            created["id"].as_str().unwrap_or("<unknown>")
        );
        Ok(created)
    }

    pub async fn list_contacts(&self) -> Result<JsonValue> {
        self.list_objects(ObjectType::Contacts).await
    }

    pub async fn get_contact(&self, id: &str) -> Result<JsonValue> {
        self.get_object(ObjectType::Contacts, id).await
    }

    pub async fn create_contact(&self, properties: JsonValue) -> Result<JsonValue> {
        self.create_object(ObjectType::Contacts, &CreateObjectRequest::contact(properties))
            .await
    }

    pub async fn list_deals(&self) -> Result<JsonValue> {
        self.list_objects(ObjectType::Deals).await
    }

    pub async fn get_deal(&self, id: &str) -> Result<JsonValue> {
        self.get_object(ObjectType::Deals, id).await
    }

    /// Create a deal, associated to `contact_id` when one is given
    pub async fn create_deal(
        &self,
        properties: JsonValue,
        contact_id: Option<&str>,
    ) -> Result<JsonValue> {
        self.create_object(ObjectType::Deals, &CreateObjectRequest::deal(properties, contact_id))
            .await
    }

    /// Objects of type `to` associated with `from/{id}`
    ///
    /// Lists the association ids, then batch-reads the targets. No
    /// associations yields `{"results": []}` without a second request.
    pub async fn associated_objects(
        &self,
        from: ObjectType,
        id: &str,
        to: ObjectType,
        properties: &[&str],
    ) -> Result<JsonValue> {
        let url = self.object_url(from, &[id, "associations", to.as_str()])?;
        let associations: AssociationList = serde_json::from_value(self.get(url, &[]).await?)
            .unwrap_or_default();

        let ids = associations.ids();
        if ids.is_empty() {
            debug!("No {} associated with {} {}", to, from, id);
            return Ok(empty_results());
        }

        debug!("Reading {} {} associated with {} {}", ids.len(), to, from, id);
        let url = self.object_url(to, &["batch", "read"])?;
        self.post(url, &BatchReadRequest::new(ids, properties)).await
    }

    pub async fn deals_for_contact(&self, contact_id: &str) -> Result<JsonValue> {
        self.associated_objects(ObjectType::Contacts, contact_id, ObjectType::Deals, DEAL_PROPERTIES)
            .await
    }

    pub async fn contacts_for_deal(&self, deal_id: &str) -> Result<JsonValue> {
        self.associated_objects(
            ObjectType::Deals,
            deal_id,
            ObjectType::Contacts,
            ASSOCIATED_CONTACT_PROPERTIES,
        )
        .await
    }
}
