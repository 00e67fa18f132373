//! esi-gate library
//!
//! Resilience layer in front of the EVE Swagger Interface: a pluggable
//! response cache with conditional revalidation, a retrying HTTP client that
//! tracks the shared error budget, and typed accessors per resource family.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod esi;
pub mod logging;
pub mod retry;

pub use cache::{CacheBackend, CacheManager, MemoryCacheManager, RedisCacheManager};
pub use config::EsiConfig;
pub use error::{CacheError, EsiError};
pub use esi::{CachedResponse, EsiClient};
pub use retry::{CallerIdentity, ErrorBudget, ErrorBudgetTracker, RequestContext, RetryClient};
