//! Retry layer for upstream calls
//!
//! Splits the work into a pure backoff policy (`policy`), the shared error
//! budget (`budget`), the per-call context (`context`) and the client that
//! drives attempts over a pluggable [`Transport`] (`client`).

mod budget;
mod client;
mod context;
mod policy;
#[cfg(test)]
pub(crate) mod testing;

pub use budget::{
    ErrorBudget, ErrorBudgetTracker, CRITICAL_REMAIN, ERROR_LIMIT_REMAIN, ERROR_LIMIT_RESET,
    ERROR_LIMIT_WINDOW, WARN_REMAIN,
};
pub use client::{RetryClient, Transport};
pub use context::{CallerIdentity, RequestContext};
pub use policy::{classify, is_retryable_status, Outcome, RetryDecision, STATUS_ERROR_LIMITED};
