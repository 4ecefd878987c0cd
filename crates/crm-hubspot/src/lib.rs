//! crm-hubspot: HubSpot CRM integration for crm-gateway
//!
//! Contacts, deals, their associations and account info over the HubSpot
//! CRM v3 REST API.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crm_hubspot::HubSpotClient;
//!
//! let client = HubSpotClient::new(&config.hubspot)?;
//!
//! // Deals associated with a contact
//! let deals = client.deals_for_contact("123").await?;
//!
//! // Create a deal linked to that contact
//! let deal = client
//!     .create_deal(json!({"dealname": "Pro Plan", "amount": "99", "dealstage": "closedwon"}), Some("123"))
//!     .await?;
//! ```

pub mod client;
pub mod error;
pub mod models;

pub use client::HubSpotClient;
pub use error::{HubSpotError, Result};
pub use models::{DealStage, ObjectType};
