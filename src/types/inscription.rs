//! Canonical inscription record
//!
//! Every source adapter maps its own payload shape into this one type.
//! `content_url` is never taken from a source; it is always derived from
//! the configured content host and the inscription id.

use serde::{Deserialize, Serialize};

/// One inscription after normalization from any source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    /// Globally unique content identifier (dedup key)
    pub id: String,
    /// Negative numbers are cursed inscriptions
    pub sequence_number: Option<i64>,
    pub owner_address: String,
    pub media_type: String,
    pub byte_length: Option<u64>,
    /// Unix epoch milliseconds
    pub created_at_millis: i64,
    pub origin_transaction_id: String,
    pub content_url: String,
}

impl CanonicalRecord {
    /// Create a record with only the identifier set
    ///
    /// Adapters fill the remaining fields from their payloads.
    pub fn new(id: impl Into<String>, content_host: &str) -> Self {
        let id = id.into();
        let content_url = content_url(content_host, &id);
        Self {
            id,
            sequence_number: None,
            owner_address: String::new(),
            media_type: String::new(),
            byte_length: None,
            created_at_millis: 0,
            origin_transaction_id: String::new(),
            content_url,
        }
    }

    /// Cursed inscriptions carry a negative sequence number
    pub fn is_cursed(&self) -> bool {
        matches!(self.sequence_number, Some(n) if n < 0)
    }
}

/// Build `{content_host}/content/{id}`
pub fn content_url(content_host: &str, id: &str) -> String {
    format!("{}/content/{}", content_host.trim_end_matches('/'), id)
}
