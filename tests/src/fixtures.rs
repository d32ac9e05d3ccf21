//! Test fixtures and event generators.

use serde_json::{json, Value};
use uuid::Uuid;

/// 2026-01-15T12:00:00Z in epoch milliseconds.
pub const T0_MS: i64 = 1_768_478_400_000;

pub const DAY_MS: i64 = 86_400_000;

pub const TENANT: &str = "shop";

/// A complete page view event.
pub fn page_view(session_id: &str) -> Value {
    json!({
        "event": "page_view",
        "category": "navigation",
        "action": "view",
        "sessionId": session_id,
        "page": "/home",
        "userAgent": "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
    })
}

/// A page view in a fresh random session.
pub fn unique_page_view() -> Value {
    page_view(&Uuid::new_v4().to_string())
}

/// An add-to-cart event with product details in metadata.
pub fn add_to_cart(session_id: &str, product_id: i64, price: f64) -> Value {
    json!({
        "event": "add_to_cart",
        "category": "shop",
        "action": "add_to_cart",
        "sessionId": session_id,
        "page": format!("/product/{product_id}"),
        "metadata": {
            "productId": product_id,
            "productName": format!("Product {product_id}"),
            "price": price,
            "quantity": 1
        }
    })
}

/// N page views, each in its own session.
pub fn page_views(n: usize) -> Vec<Value> {
    (0..n).map(|_| unique_page_view()).collect()
}

/// Batch request body.
pub fn batch_payload(events: Vec<Value>) -> Value {
    json!({ "events": events })
}

/// An event with `field` removed.
pub fn without(mut event: Value, field: &str) -> Value {
    if let Some(obj) = event.as_object_mut() {
        obj.remove(field);
    }
    event
}
