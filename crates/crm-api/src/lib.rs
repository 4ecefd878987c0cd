//! crm-api: HTTP API for crm-gateway
//!
//! REST pass-through endpoints for HubSpot contacts, deals and associations,
//! plus the `/api/chat` assistant endpoint. Built with axum.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod shutdown;

#[cfg(test)]
mod test_support;

pub use error::{ApiError, Resource, Result};
pub use server::{build_router, serve, start_server, AppState};
pub use shutdown::{Shutdown, ShutdownReason};
