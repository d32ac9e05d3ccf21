//! Tenant identity and resolution.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::error::{Error, Result};

static TENANT_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").expect("tenant id pattern is valid")
});

/// Logical partition owning a set of events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parses and validates a tenant id (1-64 chars of `[A-Za-z0-9_-]`).
    pub fn parse(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref().trim();
        if TENANT_ID_PATTERN.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::invalid_tenant(format!("malformed tenant id '{raw}'")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

/// Resolves the tenant owning the current request.
///
/// `hint` is the raw tenant identifier carried by the request, if any.
pub trait TenantResolver: Send + Sync {
    fn resolve(&self, hint: Option<&str>) -> Result<TenantId>;
}

/// Shared resolver handle.
pub type SharedTenantResolver = Arc<dyn TenantResolver>;

/// Tenant resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Request header carrying the tenant id
    #[serde(default = "default_header")]
    pub header: String,
    /// Tenant used when the header is absent
    #[serde(default = "default_tenant")]
    pub default: Option<String>,
}

fn default_header() -> String {
    "x-tenant-id".to_string()
}

fn default_tenant() -> Option<String> {
    Some("default".to_string())
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            header: default_header(),
            default: default_tenant(),
        }
    }
}

/// Uses the request hint, falling back to a configured default tenant.
#[derive(Debug, Clone)]
pub struct HeaderTenantResolver {
    default: Option<TenantId>,
}

impl HeaderTenantResolver {
    pub fn new(default: Option<TenantId>) -> Self {
        Self { default }
    }

    pub fn from_config(config: &TenantConfig) -> Result<Self> {
        let default = config.default.as_deref().map(TenantId::parse).transpose()?;
        Ok(Self::new(default))
    }
}

impl TenantResolver for HeaderTenantResolver {
    fn resolve(&self, hint: Option<&str>) -> Result<TenantId> {
        match hint.filter(|h| !h.trim().is_empty()) {
            Some(raw) => TenantId::parse(raw),
            None => self
                .default
                .clone()
                .ok_or_else(|| Error::invalid_tenant("tenant id is required")),
        }
    }
}

/// Always resolves to the same tenant.
#[derive(Debug, Clone)]
pub struct StaticTenantResolver(pub TenantId);

impl TenantResolver for StaticTenantResolver {
    fn resolve(&self, _hint: Option<&str>) -> Result<TenantId> {
        Ok(self.0.clone())
    }
}
