//! Shared error budget tracked from upstream response headers
//!
//! The upstream API allows a limited number of error responses per window and
//! reports what is left in `X-ESI-Error-Limit-*` headers. One tracker is built
//! per process and handed by `Arc` to every client.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use serde::Serialize;

use crate::error::EsiError;

pub const ERROR_LIMIT_REMAIN: &str = "x-esi-error-limit-remain";
pub const ERROR_LIMIT_RESET: &str = "x-esi-error-limit-reset";
pub const ERROR_LIMIT_WINDOW: &str = "x-esi-error-limit-window";

/// Remaining budget below which the advisory gate trips
pub const CRITICAL_REMAIN: i64 = 10;

/// Remaining budget at or below which every update is logged
pub const WARN_REMAIN: i64 = 50;

/// Snapshot of the upstream error budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorBudget {
    /// Errors still allowed in the current window
    pub remain: i64,
    /// When the window resets
    pub reset: DateTime<Utc>,
    /// Window length in seconds
    pub window: i64,
}

impl Default for ErrorBudget {
    fn default() -> Self {
        Self {
            remain: 100,
            reset: Utc::now(),
            window: 60,
        }
    }
}

/// Thread-safe holder of the process-wide [`ErrorBudget`]
#[derive(Debug, Default)]
pub struct ErrorBudgetTracker {
    budget: RwLock<ErrorBudget>,
}

impl ErrorBudgetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: ErrorBudget) -> Self {
        Self {
            budget: RwLock::new(budget),
        }
    }

    /// Current budget
    pub fn snapshot(&self) -> ErrorBudget {
        *self.budget.read()
    }

    /// Advisory gate for bulk callers: fails when `0 < remain < 10`
    pub fn check(&self) -> Result<(), EsiError> {
        let budget = self.snapshot();
        if budget.remain > 0 && budget.remain < CRITICAL_REMAIN {
            return Err(EsiError::ErrorLimited {
                remain: budget.remain,
                reset: budget.reset,
            });
        }
        Ok(())
    }

    /// Applies whichever error-limit headers parse; returns the new budget
    /// when the response reported a remaining count
    pub fn update_from_headers(&self, headers: &HeaderMap) -> Option<ErrorBudget> {
        let remain = header_i64(headers, ERROR_LIMIT_REMAIN);
        let reset = header_i64(headers, ERROR_LIMIT_RESET)
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
        let window = header_i64(headers, ERROR_LIMIT_WINDOW);

        if remain.is_none() && reset.is_none() && window.is_none() {
            return None;
        }

        let mut budget = self.budget.write();
        if let Some(remain) = remain {
            budget.remain = remain;
        }
        if let Some(reset) = reset {
            budget.reset = reset;
        }
        if let Some(window) = window {
            budget.window = window;
        }
        remain.map(|_| *budget)
    }
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
