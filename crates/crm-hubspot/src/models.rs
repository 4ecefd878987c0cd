//! Wire models for the HubSpot CRM v3 API

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Contact properties requested on list and get
pub const CONTACT_PROPERTIES: &[&str] = &[
    "firstname",
    "lastname",
    "email",
    "phone",
    "address",
    "jobtitle",
    "company",
];

/// Deal properties requested on list, get and association reads
pub const DEAL_PROPERTIES: &[&str] = &["dealname", "amount", "dealstage", "closedate", "pipeline"];

/// Contact properties requested when reading contacts through a deal
pub const ASSOCIATED_CONTACT_PROPERTIES: &[&str] = &["firstname", "lastname", "email"];

/// Page size for list endpoints
pub const LIST_LIMIT: u32 = 50;

/// HubSpot-defined association type for deal → contact
pub const DEAL_TO_CONTACT_ASSOCIATION_TYPE: u32 = 3;

const HUBSPOT_DEFINED: &str = "HUBSPOT_DEFINED";

/// CRM object families this gateway works with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Contacts,
    Deals,
}

impl ObjectType {
    /// Path segment under `/crm/v3/objects`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contacts => "contacts",
            Self::Deals => "deals",
        }
    }

    /// Properties requested on list and get
    pub fn properties(&self) -> &'static [&'static str] {
        match self {
            Self::Contacts => CONTACT_PROPERTIES,
            Self::Deals => DEAL_PROPERTIES,
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stages offered to the model when creating deals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStage {
    AppointmentScheduled,
    QualifiedToBuy,
    ClosedWon,
    ClosedLost,
}

impl DealStage {
    pub const ALL: [DealStage; 4] = [
        Self::AppointmentScheduled,
        Self::QualifiedToBuy,
        Self::ClosedWon,
        Self::ClosedLost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppointmentScheduled => "appointmentscheduled",
            Self::QualifiedToBuy => "qualifiedtobuy",
            Self::ClosedWon => "closedwon",
            Self::ClosedLost => "closedlost",
        }
    }
}

/// Body of `POST /crm/v3/objects/{type}`
///
/// `properties` is forwarded untouched; HubSpot validates it.
#[derive(Debug, Clone, Serialize)]
pub struct CreateObjectRequest {
    pub properties: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associations: Option<Vec<AssociationInput>>,
}

impl CreateObjectRequest {
    pub fn contact(properties: JsonValue) -> Self {
        Self {
            properties,
            associations: None,
        }
    }

    /// Deal body; the association list is always present, empty without a contact
    pub fn deal(properties: JsonValue, contact_id: Option<&str>) -> Self {
        let associations = contact_id
            .filter(|id| !id.is_empty())
            .map(|id| vec![AssociationInput::deal_to_contact(id)])
            .unwrap_or_default();
        Self {
            properties,
            associations: Some(associations),
        }
    }
}

/// Association created together with an object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationInput {
    pub to: ObjectRef,
    pub types: Vec<AssociationSpec>,
}

impl AssociationInput {
    pub fn deal_to_contact(contact_id: impl Into<String>) -> Self {
        Self {
            to: ObjectRef::new(contact_id),
            types: vec![AssociationSpec {
                association_category: HUBSPOT_DEFINED.to_string(),
                association_type_id: DEAL_TO_CONTACT_ASSOCIATION_TYPE,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationSpec {
    pub association_category: String,
    pub association_type_id: u32,
}

/// `{ "id": ... }` reference used by associations and batch reads
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectRef {
    pub id: String,
}

impl ObjectRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Body of `POST /crm/v3/objects/{type}/batch/read`
#[derive(Debug, Clone, Serialize)]
pub struct BatchReadRequest {
    pub inputs: Vec<ObjectRef>,
    pub properties: Vec<String>,
}

impl BatchReadRequest {
    pub fn new(ids: impl IntoIterator<Item = String>, properties: &[&str]) -> Self {
        Self {
            inputs: ids.into_iter().map(ObjectRef::new).collect(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Answer of `GET /crm/v3/objects/{type}/{id}/associations/{to}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssociationList {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<AssociatedObject>,
}

impl AssociationList {
    pub fn ids(&self) -> Vec<String> {
        self.results.iter().map(|r| r.id.clone()).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssociatedObject {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub association_type: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<AssociatedObject>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<AssociatedObject>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Object id given either as a JSON string or a JSON number
pub fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Like [`string_or_number`], with `null` read as absent
pub fn optional_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => Ok(None),
        JsonValue::String(s) => Ok(Some(s)),
        JsonValue::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Empty batch answer returned when an object has no associations
pub fn empty_results() -> JsonValue {
    serde_json::json!({ "results": [] })
}
