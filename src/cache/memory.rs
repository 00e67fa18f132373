//! In-process cache backend
//!
//! One map behind one reader/writer lock. A fresh read never returns a stale
//! entry, but the entry stays put for [`STALE_RETENTION_SECS`] so its validators can
//! drive a conditional request. Past that, the next read drops it; there is no
//! sweeper task.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use reqwest::Request;

use super::{compute_expiry, CacheEntry, CacheManager, CacheMetadata};
use crate::error::CacheError;

/// Seconds a stale entry is kept for revalidation before a read evicts it
pub const STALE_RETENTION_SECS: i64 = 600;

/// Cache backend local to this process
#[derive(Debug, Default)]
pub struct MemoryCacheManager {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Returns a clone of the stored entry, stale or not
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    fn fresh_entry(&self, key: &str, now: DateTime<Utc>) -> Option<CacheEntry> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.is_fresh(now) => return Some(entry.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Another writer may have refreshed the entry between the two locks.
        let mut entries = self.entries.write();
        if entries
            .get(key)
            .is_some_and(|entry| !entry.is_fresh(now - Duration::seconds(STALE_RETENTION_SECS)))
        {
            entries.remove(key);
        }
        None
    }
}

#[async_trait]
impl CacheManager for MemoryCacheManager {
    async fn get_with_expiry(
        &self,
        key: &str,
    ) -> Result<Option<(Vec<u8>, DateTime<Utc>)>, CacheError> {
        Ok(self
            .fresh_entry(key, Utc::now())
            .map(|entry| (entry.data, entry.expires)))
    }

    async fn get_for_not_modified(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.read().get(key).map(|entry| entry.data.clone()))
    }

    async fn get_metadata(&self, key: &str) -> Result<CacheMetadata, CacheError> {
        let now = Utc::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .map(|entry| CacheMetadata::from_entry(entry, now))
            .unwrap_or_default())
    }

    async fn set(&self, key: &str, data: &[u8], headers: &HeaderMap) -> Result<(), CacheError> {
        let entry = CacheEntry::from_response(data, headers, Utc::now());
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    async fn refresh_expiry(&self, key: &str, headers: &HeaderMap) -> Result<(), CacheError> {
        let expires = compute_expiry(headers, Utc::now());
        if let Some(entry) = self.entries.write().get_mut(key) {
            entry.expires = expires;
        }
        Ok(())
    }

    async fn set_conditional_headers(
        &self,
        request: &mut Request,
        key: &str,
    ) -> Result<(), CacheError> {
        if let Some(entry) = self.entries.read().get(key) {
            entry.apply_conditional_headers(request);
        }
        Ok(())
    }
}
