//! Cache module for upstream response bodies
//!
//! Provides the `CacheManager` trait with two interchangeable backends: an
//! in-process map and a Redis store shared by every running instance. The
//! backend is picked once when the client is built.

mod expiry;
mod manager;
mod memory;
mod redis_store;

use std::sync::Arc;

use serde::Deserialize;

use crate::error::CacheError;

pub use expiry::{compute_expiry, format_http_date, parse_http_date, DEFAULT_TTL_SECS};
pub use manager::{CacheEntry, CacheInfo, CacheManager, CacheMetadata};
pub use memory::{MemoryCacheManager, STALE_RETENTION_SECS};
pub use redis_store::{redis_ttl, RedisCacheManager, KEY_PREFIX, MIN_TTL};

/// Which cache backend a client uses
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local map
    #[default]
    Memory,
    /// Shared Redis store
    Redis { url: String },
}

/// Builds the configured backend.
///
/// # Arguments
/// * `backend` - Which store to use; Redis connects eagerly
///
/// # Returns
/// * `Ok(Arc<dyn CacheManager>)` ready for an [`EsiClient`](crate::esi::EsiClient)
/// * `Err(CacheError::Redis)` if the Redis URL is invalid or unreachable
pub async fn build_cache_manager(
    backend: &CacheBackend,
) -> Result<Arc<dyn CacheManager>, CacheError> {
    match backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCacheManager::new())),
        CacheBackend::Redis { url } => Ok(Arc::new(RedisCacheManager::connect(url).await?)),
    }
}
