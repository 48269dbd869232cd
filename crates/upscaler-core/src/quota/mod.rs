//! Quota store client.
//!
//! One hash per access code under `ac:<code>`:
//!
//! | field       | encoding                         |
//! |-------------|----------------------------------|
//! | `total`     | decimal integer                  |
//! | `remaining` | decimal integer (may go negative)|
//! | `valid`     | `"1"` enabled, anything else off |
//!
//! A record without a `valid` field counts as enabled.

mod memory;
mod redis_store;

#[cfg(test)]
mod tests;

pub use memory::MemoryQuotaStore;
pub use redis_store::RedisQuotaStore;

use async_trait::async_trait;
use std::collections::HashMap;
use upscaler_types::AccessCodeRecord;

use crate::error::StoreError;

pub const KEY_PREFIX: &str = "ac:";

pub const FIELD_TOTAL: &str = "total";
pub const FIELD_REMAINING: &str = "remaining";
pub const FIELD_VALID: &str = "valid";

/// Store key for an access code.
pub fn record_key(code: &str) -> String {
    format!("{}{}", KEY_PREFIX, code)
}

/// Access to per-code quota records.
///
/// `decrement` must be a single atomic store operation. Implementations never
/// read the counter and write it back.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// All fields of the code's record, `None` when the code is unknown.
    async fn get_record(&self, code: &str) -> Result<Option<AccessCodeRecord>, StoreError>;

    /// Atomically subtract one from `remaining`; returns the new value.
    async fn decrement(&self, code: &str) -> Result<i64, StoreError>;

    /// Create or overwrite a record (administrator tooling).
    async fn put_record(&self, code: &str, record: &AccessCodeRecord) -> Result<(), StoreError>;

    /// Flip the enabled flag. Returns `false` when the code has no record.
    async fn set_valid(&self, code: &str, valid: bool) -> Result<bool, StoreError>;
}

/// Decode a hash into a record. An empty hash is an unknown code.
pub fn parse_record(
    key: &str,
    fields: &HashMap<String, String>,
) -> Result<Option<AccessCodeRecord>, StoreError> {
    if fields.is_empty() {
        return Ok(None);
    }

    let int_field = |name: &str| -> Result<i64, StoreError> {
        let raw = fields.get(name).map(String::as_str).unwrap_or("0");
        raw.trim().parse::<i64>().map_err(|_| StoreError::CorruptRecord {
            key: key.to_string(),
            field: name.to_string(),
            value: raw.to_string(),
        })
    };

    Ok(Some(AccessCodeRecord {
        total: int_field(FIELD_TOTAL)?,
        remaining: int_field(FIELD_REMAINING)?,
        valid: fields.get(FIELD_VALID).map_or(true, |v| v.trim() == "1"),
    }))
}

/// Encode a record as hash field/value pairs.
pub fn record_fields(record: &AccessCodeRecord) -> [(&'static str, String); 3] {
    [
        (FIELD_TOTAL, record.total.to_string()),
        (FIELD_REMAINING, record.remaining.to_string()),
        (FIELD_VALID, encode_valid(record.valid).to_string()),
    ]
}

pub(crate) fn encode_valid(valid: bool) -> &'static str {
    if valid {
        "1"
    } else {
        "0"
    }
}
