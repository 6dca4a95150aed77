//! Domain records and the DTOs used by the HTTP API
//!
//! This module defines the stored records, the dashboard aggregates and the
//! request/response bodies exchanged with clients.

pub mod collection;
pub mod kpis;
pub mod requests;
pub mod responses;
pub mod user;

// Re-export commonly used types
pub use collection::{Collection, FuelType, VehicleType};
pub use kpis::{policies, AveragePrice, PricePoint, TopConsumer, TotalRevenue, VehicleVolume};
pub use requests::{
    CreateCollectionRequest, DashboardFilters, DriverHistoryQuery, ListQuery, LoginRequest,
    UpdateCollectionRequest,
};
pub use responses::{HealthResponse, TokenResponse};
pub use user::{NewUser, User, UserInfo};
