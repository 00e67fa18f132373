//! Error types for the ESI client layer
//!
//! Every error carries enough context (URL, status, attempt
//! count) for callers to log it without re-deriving what was being fetched.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Boxed error returned by a [`Transport`](crate::retry::Transport)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a cache backend
#[derive(Debug, Error)]
pub enum CacheError {
    /// The Redis store rejected or failed a command
    #[error("Redis cache error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored entry could not be encoded or decoded
    #[error("Cache entry serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by [`RetryClient`](crate::retry::RetryClient) and
/// [`EsiClient`](crate::esi::EsiClient)
#[derive(Debug, Error)]
pub enum EsiError {
    /// Network level failure (DNS, connect, timeout) after all attempts
    #[error("Request to {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        url: String,
        attempts: u32,
        #[source]
        source: BoxError,
    },

    /// Upstream kept answering 420/429/5xx until the retry budget ran out
    #[error("Request to {url} failed with status {status} after {attempts} attempt(s)")]
    RetriesExhausted {
        url: String,
        status: u16,
        attempts: u32,
    },

    /// Non-retryable upstream status
    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    /// Upstream answered 304 but there is no cached body to replay
    #[error("Received 304 Not Modified for {url} but no cache entry exists")]
    NotModifiedWithoutCache { url: String },

    /// Response body did not match the expected shape
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Reading the response body failed
    #[error("Failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Cache backend failure
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The caller cancelled the request context
    #[error("Request cancelled")]
    Cancelled,

    /// The advisory error-limit gate tripped
    #[error("ESI error limit nearly exhausted: {remain} remaining until {reset}")]
    ErrorLimited { remain: i64, reset: DateTime<Utc> },

    /// The request could not be built (bad URL, header value, uncloneable body)
    #[error("Invalid request for {url}: {reason}")]
    InvalidRequest { url: String, reason: String },

    /// A paged resource advertised more pages than the client will follow
    #[error("{url} advertised {pages} pages, more than the limit of {limit}")]
    TooManyPages { url: String, pages: u32, limit: u32 },

    /// Client configuration is unusable
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EsiError {
    /// HTTP status associated with this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            EsiError::RetriesExhausted { status, .. } | EsiError::Status { status, .. } => {
                Some(*status)
            }
            EsiError::NotModifiedWithoutCache { .. } => Some(304),
            _ => None,
        }
    }
}
