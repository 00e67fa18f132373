//! Per-call request context: cancellation plus caller identity for logs

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::EsiError;

/// Who an upstream call is being made for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub user_id: Option<String>,
    pub character_id: Option<i64>,
    pub character_name: Option<String>,
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(user) = &self.user_id {
            parts.push(format!("user={user}"));
        }
        if let Some(id) = self.character_id {
            parts.push(format!("character_id={id}"));
        }
        if let Some(name) = &self.character_name {
            parts.push(format!("character={name}"));
        }
        if parts.is_empty() {
            f.write_str("anonymous")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

/// Cancellation signal and caller identity carried through one logical call
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    caller: Option<CallerIdentity>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context cancelled together with `token`
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            caller: None,
        }
    }

    #[must_use]
    pub fn with_caller(mut self, caller: CallerIdentity) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn caller(&self) -> Option<&CallerIdentity> {
        self.caller.as_ref()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleeps for `duration` unless the context is cancelled first
    pub async fn sleep(&self, duration: Duration) -> Result<(), EsiError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(EsiError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Runs `fut` unless the context is cancelled first
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, EsiError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(EsiError::Cancelled),
            out = fut => Ok(out),
        }
    }
}
