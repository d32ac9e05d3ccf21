//! Ingress payload types and validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};
use crate::limits::MAX_METADATA_BYTES;

/// Validates serialized metadata size.
fn validate_metadata_size(metadata: &Map<String, Value>) -> std::result::Result<(), ValidationError> {
    if metadata.is_empty() {
        return Ok(());
    }

    let size = serde_json::to_vec(metadata).map(|v| v.len()).unwrap_or(0);

    if size > MAX_METADATA_BYTES {
        let mut err = ValidationError::new("metadata_too_large");
        err.message = Some(
            format!(
                "metadata {}KB exceeds {}KB limit",
                size / 1024,
                MAX_METADATA_BYTES / 1024
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Telemetry event as submitted by a client session (camelCase).
///
/// The required names are optional at the serde level so that an absent
/// field is reported as a missing-field rejection rather than a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    /// Event name (e.g. "page_view")
    #[validate(length(max = 100))]
    pub event: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 100))]
    pub action: Option<String>,
    #[validate(length(max = 500))]
    pub label: Option<String>,
    pub value: Option<f64>,
    #[validate(length(max = 128))]
    pub session_id: Option<String>,
    #[validate(length(max = 128))]
    pub user_id: Option<String>,
    #[validate(length(max = 2048))]
    pub page: Option<String>,
    #[validate(length(max = 512))]
    pub user_agent: Option<String>,
    /// Free-form properties (max 16KB serialized)
    #[validate(custom(function = "validate_metadata_size"))]
    pub metadata: Option<Map<String, Value>>,
}

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

impl TelemetryEvent {
    /// Names of required fields that are absent or blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !present(&self.event) {
            missing.push("event");
        }
        if !present(&self.category) {
            missing.push("category");
        }
        if !present(&self.action) {
            missing.push("action");
        }
        missing
    }

    /// Checks required fields and field limits.
    pub fn into_validated(self) -> Result<ValidatedEvent> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(Error::MissingFields(missing));
        }

        self.validate()
            .map_err(|e| Error::validation(e.to_string()))?;

        Ok(ValidatedEvent {
            event: self.event.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            action: self.action.unwrap_or_default(),
            label: self.label,
            value: self.value,
            session_id: self.session_id.filter(|s| !s.is_empty()),
            user_id: self.user_id.filter(|s| !s.is_empty()),
            page: self.page.filter(|s| !s.is_empty()),
            user_agent: self.user_agent.filter(|s| !s.is_empty()),
            metadata: self.metadata.unwrap_or_default(),
        })
    }
}

/// An event whose required fields are known to be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedEvent {
    pub event: String,
    pub category: String,
    pub action: String,
    pub label: Option<String>,
    pub value: Option<f64>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub page: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Map<String, Value>,
}

impl ValidatedEvent {
    /// Dedup signature of this event.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(
            &self.event,
            &self.category,
            &self.action,
            self.session_id.as_deref().unwrap_or_default(),
        )
    }
}

/// Dedup signature: `event|category|action|sessionId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn new(event: &str, category: &str, action: &str, session_id: &str) -> Self {
        Self(format!("{event}|{category}|{action}|{session_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bulk submission body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPayload {
    pub events: Vec<TelemetryEvent>,
    /// Client-side send time (epoch ms)
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub compressed: bool,
}
