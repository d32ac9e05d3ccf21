//! Privacy-preserving identifiers for stored rows.
//!
//! Raw session identifiers are never persisted; rows carry a truncated
//! SHA-256 digest salted with the tenant id.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::tenant::TenantId;

/// Hex characters kept from the digest.
const HASH_LEN: usize = 16;

fn short_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(part.as_bytes());
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(HASH_LEN);
    digest
}

/// Correlation hash for a client session.
pub fn session_hash(tenant: &TenantId, session_id: &str) -> String {
    short_hash(&[tenant.as_str(), "session", session_id])
}

/// Cross-session visitor hash.
///
/// A client-supplied `visitorHash` in metadata is passed through. Otherwise
/// the hash is derived from the user id, then from the user agent.
pub fn visitor_hash(
    tenant: &TenantId,
    metadata: &Map<String, Value>,
    user_id: Option<&str>,
    user_agent: Option<&str>,
) -> Option<String> {
    if let Some(Value::String(supplied)) = metadata.get("visitorHash") {
        if !supplied.trim().is_empty() {
            return Some(supplied.clone());
        }
    }

    match (user_id, user_agent) {
        (Some(user), _) => Some(short_hash(&[tenant.as_str(), "user", user])),
        (None, Some(ua)) => Some(short_hash(&[tenant.as_str(), "ua", ua])),
        (None, None) => None,
    }
}
