//! Route definitions
//!
//! Defines all HTTP API endpoints. Single-resource routes also answer with a
//! trailing slash, which is the form the chat tools request.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{
    account_info, chat, contact_deals, create_contact, create_deal, deal_contacts, get_contact,
    get_deal, health, list_contacts, list_deals,
};
use crate::server::AppState;

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Account
        .route("/api/account", get(account_info))
        // Contacts
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route("/api/contacts/{contact_id}", get(get_contact))
        .route("/api/contacts/{contact_id}/", get(get_contact))
        .route("/api/contacts/{contact_id}/deals", get(contact_deals))
        // Deals
        .route("/api/deals", get(list_deals).post(create_deal))
        .route("/api/deals/{deal_id}", get(get_deal))
        .route("/api/deals/{deal_id}/", get(get_deal))
        .route("/api/deals/{deal_id}/contacts", get(deal_contacts))
        // Assistant
        .route("/api/chat", post(chat))
}
