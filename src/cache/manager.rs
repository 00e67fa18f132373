//! Cache manager contract shared by every backend
//!
//! A `CacheManager` stores raw upstream bodies keyed by request URL together
//! with the validators (`ETag`, `Last-Modified`) and the expiry derived from
//! the response headers at write time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use reqwest::Request;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// A cached upstream response body with its validators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Raw response body
    #[serde(rename = "Data", with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Entity tag from the response, empty if none
    #[serde(rename = "ETag", default)]
    pub etag: String,
    /// Last-Modified header from the response, empty if none
    #[serde(rename = "LastModified", default)]
    pub last_modified: String,
    /// When the entry stops being fresh
    #[serde(rename = "Expires")]
    pub expires: DateTime<Utc>,
}

impl CacheEntry {
    /// Builds an entry from a response body and its headers
    pub fn from_response(data: &[u8], headers: &HeaderMap, now: DateTime<Utc>) -> Self {
        Self {
            data: data.to_vec(),
            etag: header_string(headers, reqwest::header::ETAG),
            last_modified: header_string(headers, reqwest::header::LAST_MODIFIED),
            expires: super::compute_expiry(headers, now),
        }
    }

    /// Whether the entry is still fresh at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires
    }

    /// Adds `If-None-Match` / `If-Modified-Since` for this entry's validators
    pub fn apply_conditional_headers(&self, request: &mut Request) {
        let headers = request.headers_mut();
        if let Some(etag) = non_empty_header(&self.etag) {
            headers.insert(IF_NONE_MATCH, etag);
        }
        if let Some(modified) = non_empty_header(&self.last_modified) {
            headers.insert(IF_MODIFIED_SINCE, modified);
        }
    }
}

/// Diagnostic view of a cache entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheMetadata {
    pub expires_at: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// True when an entry exists and is still fresh
    pub cached: bool,
}

impl CacheMetadata {
    pub(crate) fn from_entry(entry: &CacheEntry, now: DateTime<Utc>) -> Self {
        Self {
            expires_at: Some(entry.expires),
            etag: Some(entry.etag.clone()).filter(|s| !s.is_empty()),
            last_modified: Some(entry.last_modified.clone()).filter(|s| !s.is_empty()),
            cached: entry.is_fresh(now),
        }
    }
}

/// Freshness information attached to every typed response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    /// Whether the body was served from cache rather than a 200 response
    pub cached: bool,
    /// When the cached copy expires, if known
    pub expires_at: Option<DateTime<Utc>>,
}

/// Storage for upstream response bodies with HTTP conditional-request bookkeeping
///
/// Both backends honour the same contract: `get` and `get_with_expiry` only
/// return fresh entries, `get_for_not_modified` ignores expiry, and
/// `refresh_expiry` never touches the body or validators.
#[async_trait]
pub trait CacheManager: Send + Sync {
    /// Returns the fresh body and its expiry for `key`
    async fn get_with_expiry(
        &self,
        key: &str,
    ) -> Result<Option<(Vec<u8>, DateTime<Utc>)>, CacheError>;

    /// Returns the body for `key` regardless of expiry
    ///
    /// Only valid after upstream confirmed the cached body with a 304.
    async fn get_for_not_modified(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Returns expiry and validators for `key`
    async fn get_metadata(&self, key: &str) -> Result<CacheMetadata, CacheError>;

    /// Stores `data` with validators and expiry taken from `headers`
    async fn set(&self, key: &str, data: &[u8], headers: &HeaderMap) -> Result<(), CacheError>;

    /// Moves the expiry of an existing entry forward; no-op if absent
    async fn refresh_expiry(&self, key: &str, headers: &HeaderMap) -> Result<(), CacheError>;

    /// Adds conditional request headers if an entry exists for `key`
    async fn set_conditional_headers(
        &self,
        request: &mut Request,
        key: &str,
    ) -> Result<(), CacheError>;

    /// Returns the fresh body for `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.get_with_expiry(key).await?.map(|(data, _)| data))
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn non_empty_header(value: &str) -> Option<HeaderValue> {
    if value.is_empty() {
        return None;
    }
    HeaderValue::from_str(value).ok()
}

/// Base64 encoding for the body so stored JSON stays compact
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use reqwest::header::{ETAG, LAST_MODIFIED};

    fn sample_entry() -> CacheEntry {
        CacheEntry {
            data: br#"{"players":31000}"#.to_vec(),
            etag: "\"abc123\"".to_string(),
            last_modified: "Wed, 21 Oct 2015 07:28:00 GMT".to_string(),
            expires: Utc.with_ymd_and_hms(2015, 10, 21, 7, 33, 0).unwrap(),
        }
    }

    #[test]
    fn test_entry_json_uses_wire_field_names() {
        let json = serde_json::to_value(sample_entry()).expect("entry should serialize");

        assert!(json.get("Data").is_some());
        assert_eq!(json["ETag"], "\"abc123\"");
        assert_eq!(json["LastModified"], "Wed, 21 Oct 2015 07:28:00 GMT");
        assert!(json.get("Expires").is_some());

        let back: CacheEntry = serde_json::from_value(json).expect("entry should deserialize");
        assert_eq!(back, sample_entry());
    }

    #[test]
    fn test_from_response_captures_validators() {
        let mut headers = HeaderMap::new();
        headers.insert(ETAG, HeaderValue::from_static("\"v1\""));
        headers.insert(LAST_MODIFIED, HeaderValue::from_static("Tue, 20 Oct 2015 07:28:00 GMT"));
        let now = Utc::now();

        let entry = CacheEntry::from_response(b"body", &headers, now);

        assert_eq!(entry.etag, "\"v1\"");
        assert_eq!(entry.last_modified, "Tue, 20 Oct 2015 07:28:00 GMT");
        assert_eq!(entry.expires, now + Duration::seconds(5));
        assert!(entry.is_fresh(now));
        assert!(!entry.is_fresh(now + Duration::seconds(5)));
    }

    #[test]
    fn test_apply_conditional_headers_skips_empty_validators() {
        let entry = CacheEntry {
            last_modified: String::new(),
            ..sample_entry()
        };
        let mut request = Request::new(
            reqwest::Method::GET,
            "https://esi.test/status/".parse().unwrap(),
        );

        entry.apply_conditional_headers(&mut request);

        assert_eq!(request.headers()[IF_NONE_MATCH], "\"abc123\"");
        assert!(request.headers().get(IF_MODIFIED_SINCE).is_none());
    }

    #[test]
    fn test_metadata_reports_staleness() {
        let entry = sample_entry();
        let later = entry.expires + Duration::seconds(1);

        let meta = CacheMetadata::from_entry(&entry, later);

        assert!(!meta.cached);
        assert_eq!(meta.expires_at, Some(entry.expires));
        assert_eq!(meta.etag.as_deref(), Some("\"abc123\""));
    }
}
