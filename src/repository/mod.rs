//! Repository Module
//!
//! Storage traits for collection records and users. Handlers depend on the
//! traits only; the in-memory implementations back development and tests.

mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    AveragePrice, Collection, CreateCollectionRequest, DashboardFilters, DriverHistoryQuery,
    ListQuery, NewUser, PricePoint, TopConsumer, TotalRevenue, UpdateCollectionRequest, User,
    VehicleVolume,
};

pub use memory::{MemoryCollectionRepository, MemoryUserStore};

// == Collections ==
/// Persistence and aggregate queries over collection records.
///
/// Aggregate methods are pure reads; the cache layer relies on that to
/// serve them from the store.
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    async fn create(&self, req: CreateCollectionRequest) -> Result<Collection>;

    async fn get(&self, id: i64) -> Result<Option<Collection>>;

    async fn list(&self, query: &ListQuery) -> Result<Vec<Collection>>;

    /// Applies a partial update. `Ok(None)` when the record does not exist.
    async fn update(&self, id: i64, req: UpdateCollectionRequest) -> Result<Option<Collection>>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Mean sale price per fuel type, ordered by fuel.
    async fn average_price_by_fuel(&self, filters: &DashboardFilters) -> Result<Vec<AveragePrice>>;

    /// Total volume per vehicle type, ordered by vehicle.
    async fn volume_by_vehicle(&self, filters: &DashboardFilters) -> Result<Vec<VehicleVolume>>;

    /// Daily mean price per fuel, ordered by day then fuel.
    async fn price_history(&self, filters: &DashboardFilters) -> Result<Vec<PricePoint>>;

    /// Vehicle type with the largest total volume, if any data exists.
    async fn top_consumer(&self, filters: &DashboardFilters) -> Result<Option<TopConsumer>>;

    async fn total_revenue(&self, filters: &DashboardFilters) -> Result<TotalRevenue>;

    /// Records matching the CPF exactly or containing the name, case-insensitive.
    async fn driver_history(&self, query: &DriverHistoryQuery) -> Result<Vec<Collection>>;

    /// Every record, largest volume first.
    async fn ranking_by_volume(&self) -> Result<Vec<Collection>>;
}

// == Users ==
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Registers a user. Fails when the email is already taken.
    async fn insert(&self, user: NewUser) -> Result<User>;
}
