//! In-memory repositories
//!
//! `tokio::sync::RwLock` around plain collections, the same way the cache's
//! memory store is built. Aggregates are computed on every call.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::{CollectionRepository, UserStore};
use crate::error::{ApiError, Result};
use crate::models::{
    AveragePrice, Collection, CreateCollectionRequest, DashboardFilters, DriverHistoryQuery,
    FuelType, ListQuery, NewUser, PricePoint, TopConsumer, TotalRevenue,
    UpdateCollectionRequest, User, VehicleType, VehicleVolume,
};

// == Collections ==
#[derive(Debug, Default)]
struct CollectionTable {
    next_id: i64,
    rows: BTreeMap<i64, Collection>,
}

#[derive(Debug, Default)]
pub struct MemoryCollectionRepository {
    table: RwLock<CollectionTable>,
}

impl MemoryCollectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn filtered(&self, filters: &DashboardFilters) -> Vec<Collection> {
        let table = self.table.read().await;
        table
            .rows
            .values()
            .filter(|c| filters.matches(c))
            .cloned()
            .collect()
    }
}

fn mean(sum: Decimal, count: u32) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        sum / Decimal::from(count)
    }
}

fn to_float(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn checked_sum(total: Decimal, value: Decimal) -> Result<Decimal> {
    total.checked_add(value).ok_or_else(overflow)
}

fn overflow() -> ApiError {
    ApiError::Internal("aggregate exceeds the decimal range".into())
}

#[async_trait]
impl CollectionRepository for MemoryCollectionRepository {
    async fn create(&self, req: CreateCollectionRequest) -> Result<Collection> {
        let mut table = self.table.write().await;
        table.next_id += 1;
        let record = req.into_collection(table.next_id);
        table.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<Option<Collection>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Collection>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|c| query.matches(c))
            .skip(query.skip())
            .take(query.limit())
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, req: UpdateCollectionRequest) -> Result<Option<Collection>> {
        let mut table = self.table.write().await;
        Ok(table.rows.get_mut(&id).map(|record| {
            req.apply(record);
            record.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }

    async fn average_price_by_fuel(&self, filters: &DashboardFilters) -> Result<Vec<AveragePrice>> {
        let mut groups: BTreeMap<FuelType, (Decimal, u32)> = BTreeMap::new();
        for record in self.filtered(filters).await {
            let entry = groups.entry(record.fuel_type).or_default();
            entry.0 = checked_sum(entry.0, record.sale_price)?;
            entry.1 += 1;
        }

        Ok(groups
            .into_iter()
            .map(|(fuel_type, (sum, count))| AveragePrice {
                fuel_type,
                average_price: to_float(mean(sum, count)),
            })
            .collect())
    }

    async fn volume_by_vehicle(&self, filters: &DashboardFilters) -> Result<Vec<VehicleVolume>> {
        let mut groups: BTreeMap<VehicleType, Decimal> = BTreeMap::new();
        for record in self.filtered(filters).await {
            let total = groups.entry(record.vehicle_type).or_default();
            *total = checked_sum(*total, record.volume_sold)?;
        }

        Ok(groups
            .into_iter()
            .map(|(vehicle_type, total)| VehicleVolume {
                vehicle_type,
                total_volume: to_float(total),
            })
            .collect())
    }

    async fn price_history(&self, filters: &DashboardFilters) -> Result<Vec<PricePoint>> {
        let mut groups: BTreeMap<(NaiveDate, FuelType), (Decimal, u32)> = BTreeMap::new();
        for record in self.filtered(filters).await {
            let day = record.collected_at.date_naive();
            let entry = groups.entry((day, record.fuel_type)).or_default();
            entry.0 = checked_sum(entry.0, record.sale_price)?;
            entry.1 += 1;
        }

        Ok(groups
            .into_iter()
            .map(|((day, fuel_type), (sum, count))| PricePoint {
                day,
                fuel_type,
                average_price: to_float(mean(sum, count).round_dp(2)),
            })
            .collect())
    }

    async fn top_consumer(&self, filters: &DashboardFilters) -> Result<Option<TopConsumer>> {
        let mut groups: BTreeMap<VehicleType, Decimal> = BTreeMap::new();
        for record in self.filtered(filters).await {
            let total = groups.entry(record.vehicle_type).or_default();
            *total = checked_sum(*total, record.volume_sold)?;
        }

        // Ties resolve to the first vehicle type in declaration order
        let top = groups
            .into_iter()
            .fold(None::<(VehicleType, Decimal)>, |best, (vehicle, total)| match best {
                Some((_, best_total)) if best_total >= total => best,
                _ => Some((vehicle, total)),
            });

        Ok(top.map(|(vehicle_type, total_volume)| TopConsumer {
            vehicle_type,
            total_volume,
        }))
    }

    async fn total_revenue(&self, filters: &DashboardFilters) -> Result<TotalRevenue> {
        let mut total = Decimal::ZERO;
        for record in self.filtered(filters).await {
            let revenue = record
                .sale_price
                .checked_mul(record.volume_sold)
                .ok_or_else(overflow)?;
            total = checked_sum(total, revenue)?;
        }
        Ok(TotalRevenue {
            total_revenue: total.round_dp(2),
        })
    }

    async fn driver_history(&self, query: &DriverHistoryQuery) -> Result<Vec<Collection>> {
        let cpf = query.cpf.as_deref().filter(|s| !s.is_empty());
        let name = query
            .name
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|c| {
                cpf.map_or(false, |cpf| c.driver_cpf == cpf)
                    || name
                        .as_deref()
                        .map_or(false, |n| c.driver_name.to_lowercase().contains(n))
            })
            .cloned()
            .collect())
    }

    async fn ranking_by_volume(&self) -> Result<Vec<Collection>> {
        let mut rows: Vec<Collection> = self.table.read().await.rows.values().cloned().collect();
        // Stable sort keeps insertion order among equal volumes
        rows.sort_by(|a, b| b.volume_sold.cmp(&a.volume_sold));
        Ok(rows)
    }
}

// == Users ==
#[derive(Debug, Default)]
struct UserTable {
    next_id: i64,
    by_id: HashMap<i64, User>,
}

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    table: RwLock<UserTable>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.table.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let table = self.table.read().await;
        Ok(table.by_id.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let mut table = self.table.write().await;
        if table.by_id.values().any(|u| u.email == user.email) {
            return Err(ApiError::InvalidRequest(format!(
                "email {} is already registered",
                user.email
            )));
        }

        table.next_id += 1;
        let stored = User {
            id: table.next_id,
            name: user.name,
            email: user.email,
            cpf: user.cpf,
            core_id: user.core_id,
            password_hash: user.password_hash,
        };
        table.by_id.insert(stored.id, stored.clone());
        Ok(stored)
    }
}
