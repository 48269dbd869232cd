//! Redis-backed quota store.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::{debug, info};
use upscaler_types::AccessCodeRecord;

use super::{
    encode_valid, parse_record, record_fields, record_key, QuotaStore, FIELD_REMAINING,
    FIELD_VALID,
};
use crate::common::{mask_code, mask_url_credentials};
use crate::error::StoreError;

/// Quota records in Redis hashes; `ConnectionManager` reconnects on its own.
#[derive(Clone)]
pub struct RedisQuotaStore {
    connection: ConnectionManager,
}

impl RedisQuotaStore {
    /// Open a managed connection to `redis_url`.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        info!("[Quota] Connected to Redis at {}", mask_url_credentials(redis_url));
        Ok(Self { connection })
    }
}

#[async_trait]
impl QuotaStore for RedisQuotaStore {
    async fn get_record(&self, code: &str) -> Result<Option<AccessCodeRecord>, StoreError> {
        let key = record_key(code);
        let mut conn = self.connection.clone();
        let fields: HashMap<String, String> = conn.hgetall(&key).await?;
        debug!("[Quota] HGETALL {} -> {} fields", mask_code(code), fields.len());
        parse_record(&key, &fields)
    }

    async fn decrement(&self, code: &str) -> Result<i64, StoreError> {
        let mut conn = self.connection.clone();
        let remaining: i64 = conn.hincr(record_key(code), FIELD_REMAINING, -1_i64).await?;
        Ok(remaining)
    }

    async fn put_record(&self, code: &str, record: &AccessCodeRecord) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let fields = record_fields(record);
        conn.hset_multiple::<_, _, _, ()>(record_key(code), &fields).await?;
        Ok(())
    }

    async fn set_valid(&self, code: &str, valid: bool) -> Result<bool, StoreError> {
        let key = record_key(code);
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(&key).await?;
        if !exists {
            return Ok(false);
        }
        conn.hset::<_, _, _, ()>(&key, FIELD_VALID, encode_valid(valid)).await?;
        Ok(true)
    }
}
