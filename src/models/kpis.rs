//! Dashboard aggregates and the cache policies that front them

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cache::codec::record_from_cached;
use crate::cache::{Cacheable, Fields, Payload, ToFields};
use crate::error::SerializationError;
use crate::models::{FuelType, VehicleType};

/// Cached reads served by the dashboard and driver endpoints.
///
/// Every write invalidates all of [`ALL`](policies::ALL), so a new cached
/// read only needs to be added here.
pub mod policies {
    use crate::cache::CachePolicy;

    pub const AVERAGE_PRICE: CachePolicy = CachePolicy::aggregate("average_price");
    pub const VOLUME_BY_VEHICLE: CachePolicy = CachePolicy::aggregate("volume_by_vehicle");
    pub const PRICE_HISTORY: CachePolicy = CachePolicy::history("price_history");
    pub const TOP_CONSUMER: CachePolicy = CachePolicy::aggregate("top_consumer");
    pub const TOTAL_REVENUE: CachePolicy = CachePolicy::aggregate("total_revenue");
    pub const DRIVER_RANKING: CachePolicy = CachePolicy::aggregate("driver_ranking");

    pub const ALL: &[CachePolicy] = &[
        AVERAGE_PRICE,
        VOLUME_BY_VEHICLE,
        PRICE_HISTORY,
        TOP_CONSUMER,
        TOTAL_REVENUE,
        DRIVER_RANKING,
    ];
}

/// Mean price per litre for one fuel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragePrice {
    pub fuel_type: FuelType,
    pub average_price: f64,
}

impl ToFields for AveragePrice {
    fn to_fields(&self) -> Fields {
        vec![
            ("fuel_type", self.fuel_type.as_str().into()),
            ("average_price", self.average_price.into()),
        ]
    }
}

/// Litres sold to one vehicle class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleVolume {
    pub vehicle_type: VehicleType,
    pub total_volume: f64,
}

impl ToFields for VehicleVolume {
    fn to_fields(&self) -> Fields {
        vec![
            ("vehicle_type", self.vehicle_type.as_str().into()),
            ("total_volume", self.total_volume.into()),
        ]
    }
}

/// Daily mean price of one fuel, rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub day: NaiveDate,
    pub fuel_type: FuelType,
    pub average_price: f64,
}

impl ToFields for PricePoint {
    fn to_fields(&self) -> Fields {
        vec![
            ("day", self.day.format("%Y-%m-%d").to_string().into()),
            ("fuel_type", self.fuel_type.as_str().into()),
            ("average_price", self.average_price.into()),
        ]
    }
}

/// Vehicle class with the largest volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopConsumer {
    pub vehicle_type: VehicleType,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total_volume: Decimal,
}

impl ToFields for TopConsumer {
    fn to_fields(&self) -> Fields {
        vec![
            ("vehicle_type", self.vehicle_type.as_str().into()),
            ("total_volume", self.total_volume.into()),
        ]
    }
}

impl Cacheable for TopConsumer {
    fn to_payload(&self) -> Payload {
        Payload::Record(self.to_fields())
    }

    fn from_cached(value: serde_json::Value) -> Result<Self, SerializationError> {
        record_from_cached(value)
    }
}

/// Sum of price times volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalRevenue {
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total_revenue: Decimal,
}

impl ToFields for TotalRevenue {
    fn to_fields(&self) -> Fields {
        vec![("total_revenue", self.total_revenue.into())]
    }
}

impl Cacheable for TotalRevenue {
    fn to_payload(&self) -> Payload {
        Payload::Record(self.to_fields())
    }

    fn from_cached(value: serde_json::Value) -> Result<Self, SerializationError> {
        record_from_cached(value)
    }
}
