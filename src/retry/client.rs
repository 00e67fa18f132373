//! Retry client: bounded attempts, status-aware backoff, error-budget upkeep

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, Request, Response, StatusCode};

use super::budget::{ErrorBudget, ErrorBudgetTracker, WARN_REMAIN};
use super::context::RequestContext;
use super::policy::{classify, Outcome, RetryDecision};
use crate::error::{BoxError, EsiError};

/// Executes a single HTTP round trip
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, BoxError>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn send(&self, request: Request) -> Result<Response, BoxError> {
        self.execute(request).await.map_err(Into::into)
    }
}

/// HTTP executor that retries transport failures and 420/429/5xx responses
///
/// Every response except a 404 feeds the shared [`ErrorBudgetTracker`].
/// The budget gate is advisory and never consulted here; callers that run
/// bulk jobs call [`RetryClient::check_error_limits`] themselves.
#[derive(Clone)]
pub struct RetryClient {
    transport: Arc<dyn Transport>,
    budget: Arc<ErrorBudgetTracker>,
}

impl std::fmt::Debug for RetryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryClient")
            .field("budget", &self.budget.snapshot())
            .finish_non_exhaustive()
    }
}

impl RetryClient {
    pub fn new(transport: Arc<dyn Transport>, budget: Arc<ErrorBudgetTracker>) -> Self {
        Self { transport, budget }
    }

    pub fn budget(&self) -> &Arc<ErrorBudgetTracker> {
        &self.budget
    }

    /// Current error budget
    pub fn error_limits(&self) -> ErrorBudget {
        self.budget.snapshot()
    }

    /// Fails with [`EsiError::ErrorLimited`] when fewer than ten errors remain
    pub fn check_error_limits(&self) -> Result<(), EsiError> {
        self.budget.check()
    }

    /// Sends `request`, retrying up to `max_retries` times
    ///
    /// Backoff sleeps and round trips both stop early when `ctx` is cancelled.
    ///
    /// # Arguments
    /// * `ctx` - Cancellation token and caller identity logged with budget warnings
    /// * `request` - The request to send; cloned for every attempt
    /// * `max_retries` - Retries after the first attempt
    ///
    /// # Returns
    /// * `Ok(Response)` for 2xx, 304 and non-retryable 4xx statuses; the caller decides what they mean
    /// * `Err(EsiError::RetriesExhausted)` if 420, 429 or 5xx persists past `max_retries`
    /// * `Err(EsiError::Transport)` if the last attempt failed at the network level
    /// * `Err(EsiError::Cancelled)` if `ctx` was cancelled
    /// * `Err(EsiError::InvalidRequest)` if the request body cannot be cloned
    pub async fn do_with_retry(
        &self,
        ctx: &RequestContext,
        request: Request,
        max_retries: u32,
    ) -> Result<Response, EsiError> {
        let url = request.url().to_string();
        let method = request.method().clone();
        let mut attempt: u32 = 0;

        loop {
            let attempt_request = request.try_clone().ok_or_else(|| EsiError::InvalidRequest {
                url: url.clone(),
                reason: "request body cannot be cloned for retries".to_string(),
            })?;
            let last_attempt = attempt >= max_retries;

            let delay = match ctx.run(self.transport.send(attempt_request)).await? {
                Err(source) => match classify(Outcome::TransportError, attempt) {
                    RetryDecision::RetryAfter(delay) if !last_attempt => {
                        tracing::debug!(
                            retry = attempt + 1,
                            max_retries,
                            error = %source,
                            method = %method,
                            url = %url,
                            backoff_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "Retrying request after transport error"
                        );
                        delay
                    }
                    _ => {
                        return Err(EsiError::Transport {
                            url,
                            attempts: attempt + 1,
                            source,
                        })
                    }
                },
                Ok(response) => {
                    let status = response.status();
                    if status != StatusCode::NOT_FOUND {
                        self.record_budget(ctx, &method, &url, response.headers());
                    }

                    match classify(Outcome::Status(status.as_u16()), attempt) {
                        RetryDecision::Terminal => return Ok(response),
                        RetryDecision::RetryAfter(delay) => {
                            drop(response);
                            if last_attempt {
                                tracing::warn!(
                                    status = status.as_u16(),
                                    attempts = attempt + 1,
                                    method = %method,
                                    url = %url,
                                    "Giving up on request after retryable status"
                                );
                                return Err(EsiError::RetriesExhausted {
                                    url,
                                    status: status.as_u16(),
                                    attempts: attempt + 1,
                                });
                            }
                            tracing::debug!(
                                retry = attempt + 1,
                                max_retries,
                                status = status.as_u16(),
                                method = %method,
                                url = %url,
                                backoff_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                                "Retrying request after status code"
                            );
                            delay
                        }
                    }
                }
            };

            ctx.sleep(delay).await?;
            attempt += 1;
        }
    }

    fn record_budget(&self, ctx: &RequestContext, method: &Method, url: &str, headers: &HeaderMap) {
        let Some(budget) = self.budget.update_from_headers(headers) else {
            return;
        };
        if budget.remain > WARN_REMAIN {
            return;
        }

        let caller = ctx.caller();
        tracing::warn!(
            remain = budget.remain,
            reset = %budget.reset,
            window = budget.window,
            user_id = caller.and_then(|c| c.user_id.as_deref()),
            character_id = caller.and_then(|c| c.character_id),
            character_name = caller.and_then(|c| c.character_name.as_deref()),
            method = %method,
            url = %url,
            "ESI error budget running low"
        );
    }
}
