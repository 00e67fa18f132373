//! Generic cache-aware accessor shared by every resource family
//!
//! Each resource is a [`Resource`] constant (endpoint template, auth
//! requirement, response type). `EsiClient::fetch` runs the whole
//! cache → conditional request → retry → store → decode sequence for it.

use std::fmt::Display;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, Request, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::cache::{build_cache_manager, compute_expiry, CacheInfo, CacheManager};
use crate::config::EsiConfig;
use crate::error::EsiError;
use crate::retry::{ErrorBudget, ErrorBudgetTracker, RequestContext, RetryClient, Transport};

/// Header carrying the total page count of a list endpoint
pub const X_PAGES: &str = "x-pages";

/// Largest `X-Pages` value a paged fetch will follow
pub const MAX_PAGES: u32 = 1000;

/// Whether an endpoint needs the caller's access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Public,
    Bearer,
}

/// An upstream endpoint and the type its JSON body decodes into
///
/// `template` uses `{}` for each path parameter, filled in order.
pub struct Resource<T> {
    template: &'static str,
    auth: Auth,
    _response: PhantomData<fn() -> T>,
}

impl<T> Resource<T> {
    pub const fn public(template: &'static str) -> Self {
        Self {
            template,
            auth: Auth::Public,
            _response: PhantomData,
        }
    }

    pub const fn authenticated(template: &'static str) -> Self {
        Self {
            template,
            auth: Auth::Bearer,
            _response: PhantomData,
        }
    }

    pub fn template(&self) -> &'static str {
        self.template
    }

    pub fn auth(&self) -> Auth {
        self.auth
    }

    /// Fills the template's placeholders with `params`
    pub fn path(&self, params: &[&(dyn Display + Sync)]) -> Result<String, EsiError> {
        let mut pieces = self.template.split("{}");
        let mut path = pieces.next().unwrap_or_default().to_string();
        let mut used = 0;
        for piece in pieces {
            let param = params.get(used).ok_or_else(|| self.param_mismatch(params.len()))?;
            path.push_str(&param.to_string());
            path.push_str(piece);
            used += 1;
        }
        if used != params.len() {
            return Err(self.param_mismatch(params.len()));
        }
        Ok(path)
    }

    /// The token to send, enforcing the auth requirement
    fn token<'a>(&self, token: Option<&'a str>) -> Result<Option<&'a str>, EsiError> {
        match (self.auth, token) {
            (Auth::Public, _) => Ok(None),
            (Auth::Bearer, Some(token)) if !token.is_empty() => Ok(Some(token)),
            (Auth::Bearer, _) => Err(EsiError::InvalidRequest {
                url: self.template.to_string(),
                reason: "endpoint requires a bearer token".to_string(),
            }),
        }
    }

    fn param_mismatch(&self, given: usize) -> EsiError {
        EsiError::InvalidRequest {
            url: self.template.to_string(),
            reason: format!(
                "expected {} path parameter(s), got {given}",
                self.template.matches("{}").count()
            ),
        }
    }
}

impl<T> std::fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("template", &self.template)
            .field("auth", &self.auth)
            .finish()
    }
}

/// A decoded upstream value with its cache freshness
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedResponse<T> {
    pub data: T,
    pub cache: CacheInfo,
}

/// Body of a response after the status has been handled
struct Fetched {
    body: Vec<u8>,
    headers: HeaderMap,
    cache: CacheInfo,
}

/// Typed, cache-aware client for the upstream API
#[derive(Clone)]
pub struct EsiClient {
    base_url: String,
    user_agent: HeaderValue,
    cache: Arc<dyn CacheManager>,
    retry: RetryClient,
    max_retries: u32,
    enforce_error_limits: bool,
    hash_token_keys: bool,
    revalidate_paged: bool,
}

impl std::fmt::Debug for EsiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsiClient")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("enforce_error_limits", &self.enforce_error_limits)
            .field("hash_token_keys", &self.hash_token_keys)
            .field("revalidate_paged", &self.revalidate_paged)
            .finish_non_exhaustive()
    }
}

impl EsiClient {
    /// Builds a client with the configured cache backend and a `reqwest` transport
    pub async fn from_config(
        config: &EsiConfig,
        budget: Arc<ErrorBudgetTracker>,
    ) -> Result<Self, EsiError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| EsiError::Config(format!("failed to build HTTP client: {e}")))?;
        let cache = build_cache_manager(&config.cache).await?;
        Self::new(config, cache, Arc::new(http), budget)
    }

    /// Builds a client from explicit parts
    pub fn new(
        config: &EsiConfig,
        cache: Arc<dyn CacheManager>,
        transport: Arc<dyn Transport>,
        budget: Arc<ErrorBudgetTracker>,
    ) -> Result<Self, EsiError> {
        config.validate()?;
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| EsiError::Config(format!("invalid user agent: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent,
            cache,
            retry: RetryClient::new(transport, budget),
            max_retries: config.max_retries,
            enforce_error_limits: config.enforce_error_limits,
            hash_token_keys: config.hash_token_keys,
            revalidate_paged: config.revalidate_paged,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> &Arc<dyn CacheManager> {
        &self.cache
    }

    pub fn retry_client(&self) -> &RetryClient {
        &self.retry
    }

    /// Current upstream error budget
    pub fn error_limits(&self) -> ErrorBudget {
        self.retry.error_limits()
    }

    /// Advisory gate for bulk callers; fails when fewer than ten errors remain
    pub fn check_error_limits(&self) -> Result<(), EsiError> {
        self.retry.check_error_limits()
    }

    /// Cache key for `path`, isolated per token for authenticated endpoints
    pub fn cache_key(&self, path: &str, token: Option<&str>) -> String {
        let mut key = format!("{}{}", self.base_url, path);
        if let Some(token) = token {
            key.push_str("?token=");
            if self.hash_token_keys {
                key.push_str(&hex::encode(Sha256::digest(token.as_bytes())));
            } else {
                key.push_str(token);
            }
        }
        key
    }

    /// Fetches and decodes one resource, serving fresh cache entries directly.
    ///
    /// # Arguments
    /// * `ctx` - Cancellation and caller identity for the request
    /// * `resource` - Path template and auth requirement
    /// * `params` - Values for the `{}` placeholders, in order
    /// * `token` - Bearer token, required for authenticated resources
    ///
    /// # Returns
    /// * `Ok(CachedResponse)` with `cached = true` for a fresh hit or a 304
    /// * `Err(EsiError::InvalidRequest)` if params or token do not fit the resource
    /// * `Err(EsiError::Status)` for a non-retryable upstream status
    /// * `Err(EsiError::RetriesExhausted)` or `Err(EsiError::Transport)` once retries run out
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        resource: &Resource<T>,
        params: &[&(dyn Display + Sync)],
        token: Option<&str>,
    ) -> Result<CachedResponse<T>, EsiError> {
        let token = resource.token(token)?;
        let path = resource.path(params)?;
        self.fetch_path(ctx, &path, token).await
    }

    /// Fetches an arbitrary path as untyped JSON
    ///
    /// The token, when given, is sent as a bearer credential and isolates the
    /// cache entry to that caller.
    ///
    /// # Arguments
    /// * `ctx` - Cancellation and caller identity for the request
    /// * `path` - API path below the base URL, starting with `/`
    /// * `token` - Optional bearer token; empty counts as none
    ///
    /// # Returns
    /// * `Ok(CachedResponse<Value>)` with the JSON body
    /// * `Err(EsiError::InvalidRequest)` if `path` does not start with `/`
    /// * otherwise the same errors as [`EsiClient::fetch`]
    pub async fn get_raw(
        &self,
        ctx: &RequestContext,
        path: &str,
        token: Option<&str>,
    ) -> Result<CachedResponse<serde_json::Value>, EsiError> {
        if !path.starts_with('/') {
            return Err(EsiError::InvalidRequest {
                url: path.to_string(),
                reason: "path must start with '/'".to_string(),
            });
        }
        let token = token.filter(|t| !t.is_empty());
        self.fetch_path(ctx, path, token).await
    }

    async fn fetch_path<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        path: &str,
        token: Option<&str>,
    ) -> Result<CachedResponse<T>, EsiError> {
        let key = self.cache_key(path, token);
        let url = self.url(path);

        if let Some(hit) = self.cached(&url, &key).await? {
            return Ok(hit);
        }

        tracing::debug!(url = %url, "ESI cache miss");
        let fetched = self.revalidate(ctx, &url, &key, token).await?;
        Ok(CachedResponse {
            data: decode(&url, &fetched.body)?,
            cache: fetched.cache,
        })
    }

    /// Fetches every page of a list resource
    ///
    /// Only page 1 is stored in the cache, so a fresh hit returns page 1 alone
    /// with `cached = true`. On a miss page 1 goes upstream as a conditional
    /// request (a 304 replays the cached body), `X-Pages` is read from it and
    /// pages 2..N are fetched uncached with `?page=n`.
    ///
    /// With `revalidate_paged` set the fast path is skipped, so every call
    /// returns all pages.
    ///
    /// # Arguments
    /// * `ctx` - Cancellation and caller identity for every page request
    /// * `resource` - Path template of a list resource
    /// * `params` - Values for the `{}` placeholders, in order
    /// * `token` - Bearer token, required for authenticated resources
    ///
    /// # Returns
    /// * `Ok(CachedResponse<Vec<T>>)` with the items of every fetched page, in page order
    /// * `Err(EsiError::TooManyPages)` if `X-Pages` exceeds [`MAX_PAGES`]
    /// * otherwise the same errors as [`EsiClient::fetch`], for any page
    pub async fn fetch_paged<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        resource: &Resource<Vec<T>>,
        params: &[&(dyn Display + Sync)],
        token: Option<&str>,
    ) -> Result<CachedResponse<Vec<T>>, EsiError> {
        let token = resource.token(token)?;
        let path = resource.path(params)?;
        let key = self.cache_key(&path, token);
        let url = self.url(&path);

        if !self.revalidate_paged {
            if let Some(hit) = self.cached(&url, &key).await? {
                return Ok(hit);
            }
        }

        let first = self.revalidate(ctx, &url, &key, token).await?;
        let pages = page_count(&first.headers);
        if pages > MAX_PAGES {
            tracing::warn!(url = %url, pages, limit = MAX_PAGES, "Refusing oversized X-Pages");
            return Err(EsiError::TooManyPages {
                url,
                pages,
                limit: MAX_PAGES,
            });
        }
        let mut items: Vec<T> = decode(&url, &first.body)?;

        for page in 2..=pages {
            let page_url = with_page(&url, page)?;
            let request = self.build_request(&page_url, token)?;
            let response = self.send(ctx, request).await?;
            if response.status() != StatusCode::OK {
                return Err(EsiError::Status {
                    url: page_url,
                    status: response.status().as_u16(),
                });
            }
            let body = read_body(&page_url, response).await?;
            items.extend(decode::<Vec<T>>(&page_url, &body)?);
        }

        if pages > 1 {
            tracing::debug!(url = %url, pages, items = items.len(), "Fetched paged ESI resource");
        }

        Ok(CachedResponse {
            data: items,
            cache: first.cache,
        })
    }

    /// Runs `fetch` for each key with bounded concurrency, checking the error
    /// budget gate before every item
    ///
    /// Stops at the first error, including [`EsiError::ErrorLimited`].
    pub async fn fetch_many<K, T, F, Fut>(
        &self,
        keys: impl IntoIterator<Item = K>,
        concurrency: usize,
        fetch: F,
    ) -> Result<Vec<T>, EsiError>
    where
        F: Fn(K) -> Fut,
        Fut: Future<Output = Result<T, EsiError>>,
    {
        stream::iter(keys)
            .map(|key| {
                let pending = fetch(key);
                async move {
                    self.check_error_limits()?;
                    pending.await
                }
            })
            .buffered(concurrency.max(1))
            .try_collect()
            .await
    }

    /// Fresh cache entry for `key`, decoded
    async fn cached<T: DeserializeOwned>(
        &self,
        url: &str,
        key: &str,
    ) -> Result<Option<CachedResponse<T>>, EsiError> {
        let Some((body, expires)) = self.cache.get_with_expiry(key).await? else {
            return Ok(None);
        };
        tracing::debug!(url = %url, expires = %expires, "ESI cache hit");
        Ok(Some(CachedResponse {
            data: decode(url, &body)?,
            cache: CacheInfo {
                cached: true,
                expires_at: Some(expires),
            },
        }))
    }

    /// Conditional request for `key`, handling 200 and 304
    async fn revalidate(
        &self,
        ctx: &RequestContext,
        url: &str,
        key: &str,
        token: Option<&str>,
    ) -> Result<Fetched, EsiError> {
        let mut request = self.build_request(url, token)?;
        self.cache.set_conditional_headers(&mut request, key).await?;
        let response = self.send(ctx, request).await?;
        let headers = response.headers().clone();

        match response.status() {
            StatusCode::NOT_MODIFIED => {
                let body = self.cache.get_for_not_modified(key).await?.ok_or_else(|| {
                    EsiError::NotModifiedWithoutCache {
                        url: url.to_string(),
                    }
                })?;
                self.cache.refresh_expiry(key, &headers).await?;
                let expires_at = self.cache.get_metadata(key).await?.expires_at;
                tracing::debug!(url = %url, "ESI resource not modified");
                Ok(Fetched {
                    body,
                    headers,
                    cache: CacheInfo {
                        cached: true,
                        expires_at,
                    },
                })
            }
            StatusCode::OK => {
                let body = read_body(url, response).await?;
                self.cache.set(key, &body, &headers).await?;
                Ok(Fetched {
                    body,
                    cache: CacheInfo {
                        cached: false,
                        expires_at: Some(compute_expiry(&headers, Utc::now())),
                    },
                    headers,
                })
            }
            status => Err(EsiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        request: Request,
    ) -> Result<reqwest::Response, EsiError> {
        if self.enforce_error_limits {
            self.check_error_limits()?;
        }
        self.retry.do_with_retry(ctx, request, self.max_retries).await
    }

    fn build_request(&self, url: &str, token: Option<&str>) -> Result<Request, EsiError> {
        let parsed = Url::parse(url).map_err(|e| EsiError::InvalidRequest {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let mut request = Request::new(Method::GET, parsed);
        let headers = request.headers_mut();
        headers.insert(USER_AGENT, self.user_agent.clone());
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let bearer = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                EsiError::InvalidRequest {
                    url: url.to_string(),
                    reason: "access token is not a valid header value".to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, bearer);
        }
        Ok(request)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, EsiError> {
    serde_json::from_slice(body).map_err(|source| EsiError::Decode {
        url: url.to_string(),
        source,
    })
}

async fn read_body(url: &str, response: reqwest::Response) -> Result<Vec<u8>, EsiError> {
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|source| EsiError::Body {
            url: url.to_string(),
            source,
        })
}

fn page_count(headers: &HeaderMap) -> u32 {
    headers
        .get(X_PAGES)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .filter(|pages| *pages > 0)
        .unwrap_or(1)
}

fn with_page(url: &str, page: u32) -> Result<String, EsiError> {
    let mut parsed = Url::parse(url).map_err(|e| EsiError::InvalidRequest {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    parsed.query_pairs_mut().append_pair("page", &page.to_string());
    Ok(parsed.to_string())
}
