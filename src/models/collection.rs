//! Fuel-sale collection records
//!
//! One collection is a sale observed at a station: fuel, price per litre,
//! volume, and the vehicle and driver involved.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cache::{Fields, ToFields};

// == Fuel Type ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FuelType {
    Gasoline,
    Ethanol,
    DieselS10,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Gasoline => "Gasoline",
            FuelType::Ethanol => "Ethanol",
            FuelType::DieselS10 => "DieselS10",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Vehicle Type ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VehicleType {
    Car,
    Motorcycle,
    LightTruck,
    Semi,
    Bus,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Car => "Car",
            VehicleType::Motorcycle => "Motorcycle",
            VehicleType::LightTruck => "LightTruck",
            VehicleType::Semi => "Semi",
            VehicleType::Bus => "Bus",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Collection ==
/// A stored collection record.
///
/// Decimals are rendered as JSON numbers, the same form the cache stores,
/// so a cached response is indistinguishable from a computed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    /// Station tax id or device identifier
    pub station_id: String,
    pub station_name: String,
    pub city: String,
    pub state: String,
    pub collected_at: DateTime<Utc>,
    pub fuel_type: FuelType,
    /// Price per litre, two decimal places
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub sale_price: Decimal,
    /// Litres sold, two decimal places
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub volume_sold: Decimal,
    pub driver_name: String,
    pub driver_cpf: String,
    pub vehicle_plate: String,
    pub vehicle_type: VehicleType,
}

impl ToFields for Collection {
    fn to_fields(&self) -> Fields {
        vec![
            ("id", self.id.into()),
            ("station_id", self.station_id.clone().into()),
            ("station_name", self.station_name.clone().into()),
            ("city", self.city.clone().into()),
            ("state", self.state.clone().into()),
            (
                "collected_at",
                self.collected_at
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true)
                    .into(),
            ),
            ("fuel_type", self.fuel_type.as_str().into()),
            ("sale_price", self.sale_price.into()),
            ("volume_sold", self.volume_sold.into()),
            ("driver_name", self.driver_name.clone().into()),
            ("driver_cpf", self.driver_cpf.clone().into()),
            ("vehicle_plate", self.vehicle_plate.clone().into()),
            ("vehicle_type", self.vehicle_type.as_str().into()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::codec::{deserialize, serialize};
    use crate::cache::Cacheable;
    use chrono::TimeZone;

    fn sample(id: i64) -> Collection {
        Collection {
            id,
            station_id: "12.345.678/0001-90".into(),
            station_name: "Posto Central".into(),
            city: "Campinas".into(),
            state: "SP".into(),
            collected_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap(),
            fuel_type: FuelType::DieselS10,
            sale_price: Decimal::new(1250, 2),
            volume_sold: Decimal::new(4000, 2),
            driver_name: "Ana Souza".into(),
            driver_cpf: "12345678901".into(),
            vehicle_plate: "ABC1D23".into(),
            vehicle_type: VehicleType::Semi,
        }
    }

    #[test]
    fn test_enum_labels_match_serde() {
        assert_eq!(
            serde_json::to_value(FuelType::DieselS10).unwrap(),
            FuelType::DieselS10.as_str()
        );
        assert_eq!(
            serde_json::to_value(VehicleType::LightTruck).unwrap(),
            VehicleType::LightTruck.as_str()
        );
    }

    #[test]
    fn test_cached_sequence_rebuilds_collections() {
        let records = vec![sample(1), sample(2), sample(3)];
        let raw = serialize(&records.to_payload()).unwrap();

        let value = deserialize(&raw).unwrap();
        assert_eq!(value[0]["sale_price"].as_f64(), Some(12.5));

        let rebuilt = Vec::<Collection>::from_cached(value).unwrap();
        assert_eq!(rebuilt, records);
    }
}
