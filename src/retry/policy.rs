//! Retry policy for upstream responses
//!
//! `classify` is pure so backoff timing can be tested without a transport or
//! real sleeps.

use std::time::Duration;

/// Error-limit throttle status used by the upstream API
pub const STATUS_ERROR_LIMITED: u16 = 420;

const TRANSPORT_MAX: Duration = Duration::from_secs(10);
const SERVER_ERROR_MAX: Duration = Duration::from_secs(30);
const TOO_MANY_REQUESTS_MAX: Duration = Duration::from_secs(60);
const ERROR_LIMITED_MAX: Duration = Duration::from_secs(10 * 60);

/// What came back from one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The round trip failed before a status arrived
    TransportError,
    /// The upstream answered with this status
    Status(u16),
}

/// What to do about an [`Outcome`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Hand the outcome to the caller as-is
    Terminal,
    /// Sleep for the duration, then try again if attempts remain
    RetryAfter(Duration),
}

/// Decides whether `outcome` on the zero-based `attempt` is retried, and after how long
///
/// | outcome         | backoff                      |
/// |-----------------|------------------------------|
/// | transport error | `min(2^attempt s, 10 s)`     |
/// | 420             | `min(2^attempt min, 10 min)` |
/// | 5xx             | `min(2^attempt s, 30 s)`     |
/// | 429             | `min(2^attempt s, 60 s)`     |
///
/// Every other status is terminal.
pub fn classify(outcome: Outcome, attempt: u32) -> RetryDecision {
    match outcome {
        Outcome::TransportError => {
            RetryDecision::RetryAfter(exponential(Duration::from_secs(1), attempt, TRANSPORT_MAX))
        }
        Outcome::Status(STATUS_ERROR_LIMITED) => RetryDecision::RetryAfter(exponential(
            Duration::from_secs(60),
            attempt,
            ERROR_LIMITED_MAX,
        )),
        Outcome::Status(429) => RetryDecision::RetryAfter(exponential(
            Duration::from_secs(1),
            attempt,
            TOO_MANY_REQUESTS_MAX,
        )),
        Outcome::Status(status) if status >= 500 => {
            RetryDecision::RetryAfter(exponential(Duration::from_secs(1), attempt, SERVER_ERROR_MAX))
        }
        Outcome::Status(_) => RetryDecision::Terminal,
    }
}

/// Whether a status is one the retry loop backs off on
pub fn is_retryable_status(status: u16) -> bool {
    matches!(classify(Outcome::Status(status), 0), RetryDecision::RetryAfter(_))
}

fn exponential(unit: Duration, attempt: u32, max: Duration) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    unit.checked_mul(factor).unwrap_or(max).min(max)
}
