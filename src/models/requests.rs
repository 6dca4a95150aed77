//! Request DTOs
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::cache::KeyParams;
use crate::models::{Collection, FuelType, VehicleType};

/// Minimum CPF length (digits only or formatted).
pub const MIN_CPF_LENGTH: usize = 11;

/// Default and maximum page size for listings.
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 1000;

/// Prices and volumes are `NUMERIC(10, 2)`: at most 10 digits, 2 after the point.
pub const AMOUNT_MAX_DIGITS: u32 = 10;
pub const AMOUNT_DECIMAL_PLACES: u32 = 2;

// == Create ==
/// Request body for `POST /collections`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollectionRequest {
    pub station_id: String,
    pub station_name: String,
    pub city: String,
    pub state: String,
    pub collected_at: DateTime<Utc>,
    pub fuel_type: FuelType,
    pub sale_price: Decimal,
    pub volume_sold: Decimal,
    pub driver_name: String,
    pub driver_cpf: String,
    pub vehicle_plate: String,
    pub vehicle_type: VehicleType,
}

impl CreateCollectionRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        let required = [
            ("station_id", &self.station_id),
            ("station_name", &self.station_name),
            ("city", &self.city),
            ("state", &self.state),
            ("driver_name", &self.driver_name),
            ("vehicle_plate", &self.vehicle_plate),
        ];
        if let Some((name, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Some(format!("{name} cannot be empty"));
        }
        validate_amount("sale_price", self.sale_price)
            .or_else(|| validate_amount("volume_sold", self.volume_sold))
            .or_else(|| validate_cpf(&self.driver_cpf))
    }

    /// Builds the stored record under `id`.
    pub fn into_collection(self, id: i64) -> Collection {
        Collection {
            id,
            station_id: self.station_id,
            station_name: self.station_name,
            city: self.city,
            state: self.state,
            collected_at: self.collected_at,
            fuel_type: self.fuel_type,
            sale_price: self.sale_price.round_dp(2),
            volume_sold: self.volume_sold.round_dp(2),
            driver_name: self.driver_name,
            driver_cpf: self.driver_cpf,
            vehicle_plate: self.vehicle_plate,
            vehicle_type: self.vehicle_type,
        }
    }
}

// == Update ==
/// Request body for `PUT /collections/:id`. Only present fields change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCollectionRequest {
    pub station_name: Option<String>,
    pub sale_price: Option<Decimal>,
    pub volume_sold: Option<Decimal>,
    pub driver_name: Option<String>,
    pub driver_cpf: Option<String>,
    pub vehicle_plate: Option<String>,
    pub vehicle_type: Option<VehicleType>,
}

impl UpdateCollectionRequest {
    pub fn validate(&self) -> Option<String> {
        if let Some(price) = self.sale_price {
            if let Some(msg) = validate_amount("sale_price", price) {
                return Some(msg);
            }
        }
        if let Some(volume) = self.volume_sold {
            if let Some(msg) = validate_amount("volume_sold", volume) {
                return Some(msg);
            }
        }
        self.driver_cpf.as_deref().and_then(validate_cpf)
    }

    pub fn apply(self, record: &mut Collection) {
        if let Some(v) = self.station_name {
            record.station_name = v;
        }
        if let Some(v) = self.sale_price {
            record.sale_price = v.round_dp(2);
        }
        if let Some(v) = self.volume_sold {
            record.volume_sold = v.round_dp(2);
        }
        if let Some(v) = self.driver_name {
            record.driver_name = v;
        }
        if let Some(v) = self.driver_cpf {
            record.driver_cpf = v;
        }
        if let Some(v) = self.vehicle_plate {
            record.vehicle_plate = v;
        }
        if let Some(v) = self.vehicle_type {
            record.vehicle_type = v;
        }
    }
}

fn validate_amount(field: &str, value: Decimal) -> Option<String> {
    if value <= Decimal::ZERO {
        Some(format!("{field} must be greater than zero"))
    } else if value.normalize().scale() > AMOUNT_DECIMAL_PLACES {
        Some(format!(
            "{field} must have at most {AMOUNT_DECIMAL_PLACES} decimal places"
        ))
    } else if value >= max_amount() {
        Some(format!("{field} must have at most {AMOUNT_MAX_DIGITS} digits"))
    } else {
        None
    }
}

/// Smallest value with more integer digits than an amount may carry.
fn max_amount() -> Decimal {
    Decimal::from(10_i64.pow(AMOUNT_MAX_DIGITS - AMOUNT_DECIMAL_PLACES))
}

fn validate_cpf(cpf: &str) -> Option<String> {
    if cpf.trim().len() < MIN_CPF_LENGTH {
        Some(format!("driver_cpf must have at least {MIN_CPF_LENGTH} characters"))
    } else {
        None
    }
}

// == Filters ==
/// Optional filters shared by the dashboard aggregates.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DashboardFilters {
    pub fuel_type: Option<FuelType>,
    pub state: Option<String>,
    pub vehicle_type: Option<VehicleType>,
}

impl DashboardFilters {
    pub fn matches(&self, record: &Collection) -> bool {
        self.fuel_type.map_or(true, |f| record.fuel_type == f)
            && self.state.as_deref().map_or(true, |s| record.state == s)
            && self.vehicle_type.map_or(true, |v| record.vehicle_type == v)
    }
}

impl KeyParams for DashboardFilters {
    fn key_params(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("fuel_type", self.fuel_type.map(|f| f.as_str().to_string())),
            ("state", self.state.clone()),
            ("vehicle_type", self.vehicle_type.map(|v| v.as_str().to_string())),
        ]
    }
}

/// Query string of `GET /collections`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub fuel_type: Option<FuelType>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub vehicle_type: Option<VehicleType>,
}

impl ListQuery {
    pub fn matches(&self, record: &Collection) -> bool {
        self.fuel_type.map_or(true, |f| record.fuel_type == f)
            && self.city.as_deref().map_or(true, |c| record.city == c)
            && self.state.as_deref().map_or(true, |s| record.state == s)
            && self.vehicle_type.map_or(true, |v| record.vehicle_type == v)
    }

    pub fn skip(&self) -> usize {
        self.skip.unwrap_or(0)
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)
    }
}

/// Query string of `GET /drivers/history`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverHistoryQuery {
    /// Exact CPF match
    pub cpf: Option<String>,
    /// Case-insensitive partial name match
    pub name: Option<String>,
}

impl DriverHistoryQuery {
    pub fn validate(&self) -> Option<String> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        if blank(&self.cpf) && blank(&self.name) {
            Some("At least one search criterion (cpf or name) must be provided".to_string())
        } else {
            None
        }
    }
}

/// Request body for `POST /auth/token`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::derive_key;

    fn create_json() -> &'static str {
        r#"{
            "station_id": "12.345.678/0001-90",
            "station_name": "Posto Central",
            "city": "Campinas",
            "state": "SP",
            "collected_at": "2024-05-01T10:30:00Z",
            "fuel_type": "Ethanol",
            "sale_price": 3.99,
            "volume_sold": "40",
            "driver_name": "Ana Souza",
            "driver_cpf": "123.456.789-01",
            "vehicle_plate": "ABC1D23",
            "vehicle_type": "Car"
        }"#
    }

    #[test]
    fn test_create_request_deserialize_and_round() {
        let req: CreateCollectionRequest = serde_json::from_str(create_json()).unwrap();
        assert!(req.validate().is_none());

        let record = req.into_collection(7);
        assert_eq!(record.id, 7);
        assert_eq!(record.sale_price, Decimal::new(399, 2));
        assert_eq!(record.volume_sold, Decimal::new(40, 0));
    }

    #[test]
    fn test_create_rejects_non_positive_price() {
        let mut req: CreateCollectionRequest = serde_json::from_str(create_json()).unwrap();
        req.sale_price = Decimal::ZERO;
        assert_eq!(req.validate().unwrap(), "sale_price must be greater than zero");
    }

    #[test]
    fn test_create_rejects_amounts_beyond_ten_digits() {
        let mut req: CreateCollectionRequest = serde_json::from_str(create_json()).unwrap();
        req.sale_price = "70000000000000000000000000000".parse().unwrap();
        assert_eq!(req.validate().unwrap(), "sale_price must have at most 10 digits");

        req.sale_price = Decimal::new(100_000_000, 0);
        assert!(req.validate().is_some());

        req.sale_price = Decimal::new(9_999_999_999, 2);
        assert!(req.validate().is_none());

        req.volume_sold = Decimal::new(12_500, 3);
        assert!(req.validate().is_none(), "trailing zeros are not extra places");
        req.volume_sold = Decimal::new(12_501, 3);
        assert_eq!(
            req.validate().unwrap(),
            "volume_sold must have at most 2 decimal places"
        );
    }

    #[test]
    fn test_create_rejects_short_cpf_and_blank_fields() {
        let mut req: CreateCollectionRequest = serde_json::from_str(create_json()).unwrap();
        req.driver_cpf = "123".into();
        assert!(req.validate().unwrap().contains("driver_cpf"));

        req.city = "  ".into();
        assert_eq!(req.validate().unwrap(), "city cannot be empty");
    }

    #[test]
    fn test_update_validate_and_apply() {
        let mut record: Collection = {
            let req: CreateCollectionRequest = serde_json::from_str(create_json()).unwrap();
            req.into_collection(1)
        };

        let bad = UpdateCollectionRequest {
            volume_sold: Some(Decimal::new(-1, 0)),
            ..Default::default()
        };
        assert!(bad.validate().is_some());

        let too_precise = UpdateCollectionRequest {
            sale_price: Some(Decimal::new(5555, 3)),
            ..Default::default()
        };
        assert_eq!(
            too_precise.validate().unwrap(),
            "sale_price must have at most 2 decimal places"
        );

        let patch = UpdateCollectionRequest {
            sale_price: Some(Decimal::new(556, 2)),
            vehicle_type: Some(VehicleType::Bus),
            ..Default::default()
        };
        assert!(patch.validate().is_none());
        patch.apply(&mut record);
        assert_eq!(record.sale_price, Decimal::new(556, 2));
        assert_eq!(record.vehicle_type, VehicleType::Bus);
        assert_eq!(record.station_name, "Posto Central");
    }

    #[test]
    fn test_dashboard_filter_key_params() {
        let filters = DashboardFilters {
            fuel_type: Some(FuelType::Gasoline),
            state: None,
            vehicle_type: Some(VehicleType::Semi),
        };
        assert_eq!(
            derive_key("kpi_average_price", &filters),
            "kpi_average_price:fuel_type:Gasoline:vehicle_type:Semi"
        );
    }

    #[test]
    fn test_list_query_limits() {
        let query = ListQuery {
            limit: Some(5000),
            ..Default::default()
        };
        assert_eq!(query.skip(), 0);
        assert_eq!(query.limit(), MAX_PAGE_SIZE);
        assert_eq!(ListQuery::default().limit(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_driver_history_requires_criterion() {
        assert!(DriverHistoryQuery::default().validate().is_some());
        let query = DriverHistoryQuery {
            cpf: None,
            name: Some("ana".into()),
        };
        assert!(query.validate().is_none());
    }
}
