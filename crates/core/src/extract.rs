//! Denormalized commerce field extraction from event metadata.
//!
//! Numeric-looking strings are coerced; anything else that is not a number
//! is treated as absent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Commerce fields lifted out of metadata into their own columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommerceFields {
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub category_name: Option<String>,
    pub price: Option<f64>,
    pub quantity: u32,
    pub device_type: Option<String>,
}

impl CommerceFields {
    pub fn from_metadata(metadata: &Map<String, Value>) -> Self {
        Self {
            product_id: first(metadata, &["productId", "item_id"]).and_then(as_integer),
            product_name: first(metadata, &["productName", "item_name"]).and_then(as_text),
            category_name: first(metadata, &["category", "category_name"]).and_then(as_text),
            price: first(metadata, &["price"])
                .and_then(as_number)
                .or_else(|| first(metadata, &["value"]).and_then(as_number)),
            quantity: first(metadata, &["quantity"])
                .and_then(as_integer)
                .filter(|q| *q > 0)
                .and_then(|q| u32::try_from(q).ok())
                .unwrap_or(1),
            device_type: first(metadata, &["deviceType"]).and_then(as_text),
        }
    }
}

/// First non-null value among `keys`.
fn first<'a>(metadata: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| metadata.get(*k))
        .find(|v| !v.is_null())
}

/// Finite number, or a string that parses as one.
pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Integral number, or a string that parses as one.
pub fn as_integer(value: &Value) -> Option<i64> {
    if let Value::Number(n) = value {
        if let Some(i) = n.as_i64() {
            return Some(i);
        }
    }
    let n = as_number(value)?;
    (n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64).then_some(n as i64)
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
