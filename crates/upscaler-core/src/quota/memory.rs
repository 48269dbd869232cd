//! In-process quota store for local development and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use upscaler_types::AccessCodeRecord;

use super::{record_key, QuotaStore};
use crate::error::StoreError;

/// Records keyed by access code.
///
/// The decrement runs under the map's shard lock, which gives the same
/// single-step atomicity as `HINCRBY`.
#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
    records: DashMap<String, AccessCodeRecord>,
    decrements: AtomicUsize,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `(code, record)` pairs.
    pub fn with_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (String, AccessCodeRecord)>,
    {
        let store = Self::new();
        for (code, record) in records {
            store.records.insert(code, record);
        }
        store
    }

    /// Current record without going through the async trait.
    pub fn snapshot(&self, code: &str) -> Option<AccessCodeRecord> {
        self.records.get(code).map(|r| *r)
    }

    /// Number of decrements applied so far.
    pub fn decrement_count(&self) -> usize {
        self.decrements.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn get_record(&self, code: &str) -> Result<Option<AccessCodeRecord>, StoreError> {
        Ok(self.snapshot(code))
    }

    async fn decrement(&self, code: &str) -> Result<i64, StoreError> {
        let mut record = self
            .records
            .get_mut(code)
            .ok_or_else(|| StoreError::NotFound { key: record_key(code) })?;
        record.remaining -= 1;
        self.decrements.fetch_add(1, Ordering::SeqCst);
        Ok(record.remaining)
    }

    async fn put_record(&self, code: &str, record: &AccessCodeRecord) -> Result<(), StoreError> {
        self.records.insert(code.to_string(), *record);
        Ok(())
    }

    async fn set_valid(&self, code: &str, valid: bool) -> Result<bool, StoreError> {
        match self.records.get_mut(code) {
            Some(mut record) => {
                record.valid = valid;
                Ok(true)
            },
            None => Ok(false),
        }
    }
}
