//! Fuelwatch - fuel-sale collection API
//!
//! Records fuel sales and serves dashboard aggregates through a
//! read-through cache with TTL, write-triggered invalidation and a data
//! freshness marker.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;

pub use api::{create_router, AppState};
pub use config::Config;
