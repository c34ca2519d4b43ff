//! Retrieval strategies.
//!
//! Each strategy receives the active store and the fetcher through an
//! explicit [`StrategyContext`]. Network failures are handled inside the
//! strategy; the only error that escapes is `Error::Unavailable` (no
//! network, no stored copy, not a navigation). Store read/write failures
//! are logged and treated as a miss or a skipped write.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use swcache_core::{Error, Store, StoredResponse};
use url::Url;

use crate::fetch::{FetchResponse, Fetcher};
use crate::request::Request;

/// Served when a navigation fails and the offline document itself is not
/// in the store.
const BUILTIN_OFFLINE_HTML: &str = "<!doctype html>\
<html><head><meta charset=\"utf-8\"><title>Offline</title></head>\
<body><h1>You are offline</h1><p>Check your connection and try again.</p></body></html>";

/// Retrieval strategy chosen by the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
    Navigation,
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Live network response.
    Network,
    /// Stored copy of the same request.
    Cache,
    /// The offline fallback document.
    OfflineFallback,
}

/// Response produced by a strategy.
#[derive(Debug, Clone)]
pub struct Served {
    pub strategy: Strategy,
    pub source: ResponseSource,
    pub response: StoredResponse,
}

impl Served {
    fn new(strategy: Strategy, source: ResponseSource, response: StoredResponse) -> Self {
        Self { strategy, source, response }
    }
}

/// Everything a strategy needs, passed explicitly.
#[derive(Clone)]
pub struct StrategyContext {
    pub store: Store,
    pub fetcher: Arc<dyn Fetcher>,
    /// Bound on each network attempt; an elapsed timeout counts as a
    /// network failure.
    pub timeout: Duration,
    pub offline_url: Url,
}

impl StrategyContext {
    async fn fetch(&self, request: &Request) -> Result<FetchResponse, Error> {
        match tokio::time::timeout(self.timeout, self.fetcher.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(format!("{} after {}ms", request.url, self.timeout.as_millis()))),
        }
    }

    async fn lookup(&self, method: &str, url: &str) -> Option<StoredResponse> {
        match self.store.match_request(method, url).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(store = self.store.name(), url, error = %e, "store lookup failed");
                None
            }
        }
    }

    /// Stored copy of `request`, if it may be served from the store.
    async fn cached(&self, request: &Request) -> Option<StoredResponse> {
        if !request.is_cacheable() {
            return None;
        }
        self.lookup(request.method_str(), request.url.as_str()).await
    }

    async fn remember(&self, request: &Request, response: &StoredResponse) {
        if !request.is_cacheable() {
            tracing::debug!(method = %request.method, url = %request.url, "not storing response");
            return;
        }
        if let Err(e) = self.store.put(response).await {
            tracing::warn!(store = self.store.name(), url = %response.url, error = %e, "store write failed");
        }
    }

    async fn offline_document(&self) -> StoredResponse {
        match self.lookup("GET", self.offline_url.as_str()).await {
            Some(document) => document,
            None => {
                tracing::warn!(url = %self.offline_url, "offline document missing from store, serving built-in page");
                StoredResponse::new(
                    "GET",
                    self.offline_url.as_str(),
                    StatusCode::SERVICE_UNAVAILABLE.as_u16(),
                    vec![("content-type".into(), "text/html; charset=utf-8".into())],
                    BUILTIN_OFFLINE_HTML.as_bytes().to_vec(),
                )
            }
        }
    }
}

impl Strategy {
    /// Run this strategy for `request`.
    pub async fn execute(self, ctx: &StrategyContext, request: &Request) -> Result<Served, Error> {
        match self {
            Strategy::NetworkFirst => network_first(ctx, request).await,
            Strategy::CacheFirst => cache_first(ctx, request).await,
            Strategy::Navigation => navigation(ctx, request).await,
        }
    }
}

async fn network_first(ctx: &StrategyContext, request: &Request) -> Result<Served, Error> {
    let strategy = Strategy::NetworkFirst;

    let err = match ctx.fetch(request).await {
        Ok(response) => {
            let captured = response.capture(request);
            if response.status == StatusCode::OK {
                ctx.remember(request, &captured).await;
            }
            return Ok(Served::new(strategy, ResponseSource::Network, captured));
        }
        Err(err) => err,
    };

    tracing::debug!(url = %request.url, error = %err, "network failed, trying store");

    if let Some(cached) = ctx.cached(request).await {
        return Ok(Served::new(strategy, ResponseSource::Cache, cached));
    }

    if request.is_navigation() {
        return Ok(Served::new(strategy, ResponseSource::OfflineFallback, ctx.offline_document().await));
    }

    Err(Error::Unavailable(format!("{} {}: {}", request.method, request.url, err)))
}

async fn cache_first(ctx: &StrategyContext, request: &Request) -> Result<Served, Error> {
    let strategy = Strategy::CacheFirst;

    if let Some(cached) = ctx.cached(request).await {
        tracing::debug!(url = %request.url, "store hit");
        spawn_refresh(ctx.clone(), request.clone());
        return Ok(Served::new(strategy, ResponseSource::Cache, cached));
    }

    match ctx.fetch(request).await {
        Ok(response) => {
            let captured = response.capture(request);
            if response.status == StatusCode::OK {
                ctx.remember(request, &captured).await;
            }
            Ok(Served::new(strategy, ResponseSource::Network, captured))
        }
        Err(err) => {
            tracing::error!(url = %request.url, error = %err, "failed to fetch resource");
            Err(Error::Unavailable(format!("{} {}: {}", request.method, request.url, err)))
        }
    }
}

async fn navigation(ctx: &StrategyContext, request: &Request) -> Result<Served, Error> {
    let strategy = Strategy::Navigation;

    match ctx.fetch(request).await {
        Ok(response) => Ok(Served::new(strategy, ResponseSource::Network, response.capture(request))),
        Err(err) => {
            tracing::debug!(url = %request.url, error = %err, "navigation failed, trying store");
            match ctx.cached(request).await {
                Some(cached) => Ok(Served::new(strategy, ResponseSource::Cache, cached)),
                None => Ok(Served::new(strategy, ResponseSource::OfflineFallback, ctx.offline_document().await)),
            }
        }
    }
}

/// Refresh a stored copy without holding up the caller.
///
/// The task is detached and its outcome discarded: a failed refresh keeps
/// serving the previous copy until the next successful fetch.
fn spawn_refresh(ctx: StrategyContext, request: Request) {
    tokio::spawn(async move {
        match ctx.fetch(&request).await {
            Ok(response) if response.status == StatusCode::OK => {
                ctx.remember(&request, &response.capture(&request)).await;
            }
            Ok(response) => {
                tracing::debug!(url = %request.url, status = response.status.as_u16(), "refresh not stored");
            }
            Err(err) => tracing::debug!(url = %request.url, error = %err, "background refresh failed"),
        }
    });
}
