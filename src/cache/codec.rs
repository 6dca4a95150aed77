//! Serialization Adapter
//!
//! Converts query results to the cache's JSON wire format and back. Records
//! expose their fields through [`ToFields`]; each field is converted on its
//! own so that fixed-point decimals become floats and values with no JSON
//! form fail loudly instead of being dropped.
//!
//! Decoding only produces a generic [`Value`]. Rebuilding typed records is
//! the job of each type's [`Cacheable`] implementation.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::error::SerializationError;

// == Field Value ==
/// One field of a record, as handed to the adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Fixed-point value, written to JSON as a float
    Decimal(Decimal),
    /// Raw bytes have no JSON form; serializing one is an error
    Bytes(Vec<u8>),
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<Decimal> for FieldValue {
    fn from(v: Decimal) -> Self {
        FieldValue::Decimal(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

/// Flat field list of one record, in declaration order.
pub type Fields = Vec<(&'static str, FieldValue)>;

// == Capabilities ==
/// A record that can be flattened into named fields.
pub trait ToFields {
    fn to_fields(&self) -> Fields;
}

/// Shape of a result about to be cached.
#[derive(Debug, Clone)]
pub enum Payload {
    Record(Fields),
    Sequence(Vec<Fields>),
    /// Data already in JSON shape, stored as-is
    Json(Value),
}

/// A result type the cache-aside layer can store and rebuild.
pub trait Cacheable: Sized {
    fn to_payload(&self) -> Payload;

    /// Rebuilds the typed result from decoded cache contents.
    fn from_cached(value: Value) -> Result<Self, SerializationError>;

    /// Empty results are returned but never cached.
    fn is_empty_result(&self) -> bool {
        false
    }
}

impl<T: ToFields + DeserializeOwned> Cacheable for Vec<T> {
    fn to_payload(&self) -> Payload {
        Payload::Sequence(self.iter().map(ToFields::to_fields).collect())
    }

    fn from_cached(value: Value) -> Result<Self, SerializationError> {
        record_from_cached(value)
    }

    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

impl Cacheable for Value {
    fn to_payload(&self) -> Payload {
        Payload::Json(self.clone())
    }

    fn from_cached(value: Value) -> Result<Self, SerializationError> {
        Ok(value)
    }

    fn is_empty_result(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

/// Rebuilds a serde type from decoded cache contents.
pub fn record_from_cached<T: DeserializeOwned>(value: Value) -> Result<T, SerializationError> {
    Ok(serde_json::from_value(value)?)
}

// == Encode / Decode ==

/// Encodes a payload as a JSON string.
pub fn serialize(payload: &Payload) -> Result<String, SerializationError> {
    let value = match payload {
        Payload::Record(fields) => fields_to_json(fields)?,
        Payload::Sequence(records) => Value::Array(
            records
                .iter()
                .map(fields_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Payload::Json(value) => value.clone(),
    };
    Ok(serde_json::to_string(&value)?)
}

/// Parses cached JSON into a generic value.
pub fn deserialize(raw: &str) -> Result<Value, SerializationError> {
    Ok(serde_json::from_str(raw)?)
}

fn fields_to_json(fields: &Fields) -> Result<Value, SerializationError> {
    let mut map = Map::with_capacity(fields.len());
    for (name, value) in fields {
        map.insert((*name).to_string(), convert_field(name, value)?);
    }
    Ok(Value::Object(map))
}

fn convert_field(name: &str, value: &FieldValue) -> Result<Value, SerializationError> {
    Ok(match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Int(i) => Value::Number((*i).into()),
        FieldValue::Text(s) => Value::String(s.clone()),
        FieldValue::Float(f) => float_value(name, *f)?,
        FieldValue::Decimal(d) => {
            let f = d
                .to_f64()
                .ok_or_else(|| SerializationError::DecimalOverflow(name.to_string()))?;
            float_value(name, f)?
        }
        FieldValue::Bytes(_) => {
            return Err(SerializationError::Unrepresentable {
                field: name.to_string(),
                kind: "bytes",
            })
        }
    })
}

fn float_value(name: &str, f: f64) -> Result<Value, SerializationError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| SerializationError::Unrepresentable {
            field: name.to_string(),
            kind: "non-finite float",
        })
}
