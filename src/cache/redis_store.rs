//! Redis cache backend shared across process instances
//!
//! Entries are stored as JSON under `esi:cache:<key>` with a millisecond TTL,
//! so eviction is left to Redis and no local lock is taken.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use reqwest::header::HeaderMap;
use reqwest::Request;

use super::{compute_expiry, CacheEntry, CacheManager, CacheMetadata};
use crate::error::CacheError;

/// Namespace prepended to every cache key
pub const KEY_PREFIX: &str = "esi:cache:";

/// Shortest TTL handed to Redis
pub const MIN_TTL: Duration = Duration::from_secs(5);

/// TTL for an entry expiring at `expires`, never below [`MIN_TTL`]
pub fn redis_ttl(expires: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (expires - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
        .max(MIN_TTL)
}

/// Cache backend storing entries in Redis
#[derive(Clone)]
pub struct RedisCacheManager {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisCacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheManager")
            .field("key_prefix", &KEY_PREFIX)
            .finish_non_exhaustive()
    }
}

impl RedisCacheManager {
    /// Opens a managed, auto-reconnecting connection to `url`
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!(url = %redact_url(url), "Connected Redis cache backend");
        Ok(Self { conn })
    }

    /// Wraps an existing connection manager
    pub fn with_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub fn key_prefix(&self) -> &'static str {
        KEY_PREFIX
    }

    fn storage_key(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    async fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(Self::storage_key(key)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn store(&self, key: &str, entry: &CacheEntry, now: DateTime<Utc>) -> Result<(), CacheError> {
        let payload = serde_json::to_string(entry)?;
        let ttl_ms = u64::try_from(redis_ttl(entry.expires, now).as_millis()).unwrap_or(u64::MAX);
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(Self::storage_key(key))
            .arg(payload)
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CacheManager for RedisCacheManager {
    async fn get_with_expiry(
        &self,
        key: &str,
    ) -> Result<Option<(Vec<u8>, DateTime<Utc>)>, CacheError> {
        let now = Utc::now();
        Ok(self
            .load(key)
            .await?
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| (entry.data, entry.expires)))
    }

    async fn get_for_not_modified(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.load(key).await?.map(|entry| entry.data))
    }

    async fn get_metadata(&self, key: &str) -> Result<CacheMetadata, CacheError> {
        let now = Utc::now();
        Ok(self
            .load(key)
            .await?
            .map(|entry| CacheMetadata::from_entry(&entry, now))
            .unwrap_or_default())
    }

    async fn set(&self, key: &str, data: &[u8], headers: &HeaderMap) -> Result<(), CacheError> {
        let now = Utc::now();
        let entry = CacheEntry::from_response(data, headers, now);
        self.store(key, &entry, now).await
    }

    async fn refresh_expiry(&self, key: &str, headers: &HeaderMap) -> Result<(), CacheError> {
        let Some(mut entry) = self.load(key).await? else {
            return Ok(());
        };
        let now = Utc::now();
        entry.expires = compute_expiry(headers, now);
        self.store(key, &entry, now).await
    }

    async fn set_conditional_headers(
        &self,
        request: &mut Request,
        key: &str,
    ) -> Result<(), CacheError> {
        if let Some(entry) = self.load(key).await? {
            entry.apply_conditional_headers(request);
        }
        Ok(())
    }
}

/// Strips credentials from a Redis URL before it reaches the logs
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
