//! The two fetch-resolution strategies.
//!
//! Every path through a strategy ends in a concrete response: network
//! failures become either a cached copy or a synthesized 503.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::net::{message::CONTENT_TYPE, FetchError, Fetcher, HttpResponse};

use super::InterceptedRequest;

pub const OFFLINE_STATUS: u16 = 503;

/// Where a resolved response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Served from the bucket without touching the network
    Cache,
    /// Live network response
    Network,
    /// Network failed; served the last stored copy
    StaleCache,
    /// Network failed and nothing was stored
    OfflineFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub response: HttpResponse,
    pub source: ResolutionSource,
}

impl Resolution {
    fn new(response: HttpResponse, source: ResolutionSource) -> Self {
        Self { response, source }
    }
}

/// `503 Offline` for static assets.
pub fn offline_asset_response() -> HttpResponse {
    HttpResponse::new(OFFLINE_STATUS, "Offline").with_header(CONTENT_TYPE, "text/plain")
}

/// `503` JSON body for API requests, shaped like a live error response.
pub fn offline_api_response() -> HttpResponse {
    let body = json!({"error": "offline", "message": "No cached data available"});
    HttpResponse::new(OFFLINE_STATUS, body.to_string()).with_header(CONTENT_TYPE, "application/json")
}

/// Network and store access shared by both strategies.
#[derive(Clone)]
struct StrategyContext {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Fetcher>,
    timeout: Option<Duration>,
}

impl StrategyContext {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<HttpResponse, FetchError> {
        let http = request.to_http();
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.network.fetch(&http))
                .await
                .unwrap_or(Err(FetchError::Timeout)),
            None => self.network.fetch(&http).await,
        }
    }

    /// Read failures count as a miss.
    async fn lookup(&self, bucket: &str, key: &str) -> Option<HttpResponse> {
        match self.store.get(bucket, key).await {
            Ok(cached) => cached.map(|c| c.response),
            Err(e) => {
                warn!(bucket, key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Write failures are logged and never change the page's response.
    async fn store_copy(&self, bucket: &str, key: &str, response: &HttpResponse) {
        if let Err(e) = self.store.put(bucket, key, response.clone()).await {
            warn!(bucket, key, error = %e, "Failed to cache response");
        }
    }
}

/// Serve from the bucket when possible; otherwise fetch and remember.
#[derive(Clone)]
pub struct CacheFirst {
    ctx: StrategyContext,
}

impl CacheFirst {
    pub fn new(store: Arc<dyn CacheStore>, network: Arc<dyn Fetcher>) -> Self {
        Self {
            ctx: StrategyContext {
                store,
                network,
                timeout: None,
            },
        }
    }

    /// Bound the network attempt. Unset by default.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ctx.timeout = timeout;
        self
    }

    pub async fn handle(&self, bucket: &str, request: &InterceptedRequest) -> Resolution {
        let key = request.cache_key();
        if let Some(cached) = self.ctx.lookup(bucket, &key).await {
            debug!(url = %request.url, bucket, "Cache hit");
            return Resolution::new(cached, ResolutionSource::Cache);
        }

        match self.ctx.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    self.ctx.store_copy(bucket, &key, &response).await;
                }
                Resolution::new(response, ResolutionSource::Network)
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "Asset unavailable offline");
                Resolution::new(offline_asset_response(), ResolutionSource::OfflineFallback)
            }
        }
    }
}

/// Prefer the live response; fall back to the last stored one.
#[derive(Clone)]
pub struct NetworkFirst {
    ctx: StrategyContext,
}

impl NetworkFirst {
    pub fn new(store: Arc<dyn CacheStore>, network: Arc<dyn Fetcher>) -> Self {
        Self {
            ctx: StrategyContext {
                store,
                network,
                timeout: None,
            },
        }
    }

    /// Bound the network attempt. Unset by default.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ctx.timeout = timeout;
        self
    }

    pub async fn handle(&self, bucket: &str, request: &InterceptedRequest) -> Resolution {
        let key = request.cache_key();
        match self.ctx.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    self.ctx.store_copy(bucket, &key, &response).await;
                }
                Resolution::new(response, ResolutionSource::Network)
            }
            Err(e) => match self.ctx.lookup(bucket, &key).await {
                Some(cached) => {
                    debug!(url = %request.url, error = %e, "Network failed, serving cached copy");
                    Resolution::new(cached, ResolutionSource::StaleCache)
                }
                None => {
                    warn!(url = %request.url, error = %e, "Network failed with nothing cached");
                    Resolution::new(offline_api_response(), ResolutionSource::OfflineFallback)
                }
            },
        }
    }
}
