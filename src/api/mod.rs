//! API Module
//!
//! HTTP handlers and routing for the collection and dashboard REST API.
//! Every route lives under `/api/v1`; all but `/health`, `/auth/token` and
//! `/data-status` require a bearer token.

pub mod handlers;
pub mod routes;
mod state;

pub use handlers::*;
pub use routes::{create_router, API_PREFIX};
pub use state::AppState;
