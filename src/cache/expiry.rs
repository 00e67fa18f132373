//! Expiry computation from upstream response headers
//!
//! Precedence: `Expires` (RFC1123, then RFC1123 with numeric zone), then
//! `Cache-Control: max-age=N`, then a five second default.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, CACHE_CONTROL, EXPIRES};

/// Lifetime applied when the response carries no usable freshness headers
pub const DEFAULT_TTL_SECS: i64 = 5;

const RFC1123: &str = "%a, %d %b %Y %H:%M:%S GMT";
const RFC1123Z: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Computes when a response stored at `now` stops being fresh
pub fn compute_expiry(headers: &HeaderMap, now: DateTime<Utc>) -> DateTime<Utc> {
    if let Some(expires) = header_str(headers, &EXPIRES).and_then(parse_http_date) {
        return expires;
    }

    // Negative or out-of-range lifetimes fall through to the default.
    if let Some(expires) = header_str(headers, &CACHE_CONTROL)
        .and_then(parse_max_age)
        .filter(|secs| *secs >= 0)
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
    {
        return expires;
    }

    now + Duration::seconds(DEFAULT_TTL_SECS)
}

/// Parses an HTTP date in RFC1123 form, falling back to RFC1123 with a numeric zone
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, RFC1123)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_str(value, RFC1123Z).map(|dt| dt.with_timezone(&Utc)))
        .ok()
}

/// Formats a timestamp the way `Expires` and `Last-Modified` headers carry it
pub fn format_http_date(at: DateTime<Utc>) -> String {
    at.format(RFC1123).to_string()
}

/// Extracts `N` from the first `max-age=N` token of a Cache-Control value
fn parse_max_age(value: &str) -> Option<i64> {
    let start = value.find("max-age=")? + "max-age=".len();
    let rest = &value[start..];
    let end = rest.find(',').unwrap_or(rest.len());
    rest[..end].trim().parse().ok()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
