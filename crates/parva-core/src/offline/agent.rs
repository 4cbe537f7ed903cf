//! Offline agent lifecycle: install, activate, then serve fetches.
//!
//! The host drives the agent by awaiting each lifecycle future to
//! completion; the work of an event is finished when its future resolves.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{BucketPurpose, CacheError, CacheStore, CacheVersion};
use crate::net::{Fetcher, HttpRequest, HttpResponse};

use super::classifier::{RequestClassifier, Route};
use super::request::cache_key;
use super::strategy::{CacheFirst, NetworkFirst, Resolution};
use super::InterceptedRequest;

/// Minimal app shell fetched at install time.
pub const DEFAULT_PRECACHE_PATHS: &[&str] = &["/", "/index.html", "/manifest.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Installing,
    /// Installed; activation follows immediately since waiting is skipped.
    Waiting,
    Active,
    /// A newer version took over.
    Superseded,
    /// Install failed; the previous version stays in charge.
    Redundant,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentState::Installing => "installing",
            AgentState::Waiting => "waiting",
            AgentState::Active => "active",
            AgentState::Superseded => "superseded",
            AgentState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Failed to precache {path}: {reason}")]
    Install { path: String, reason: String },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Agent is {actual}, expected {expected}")]
    InvalidState {
        expected: AgentState,
        actual: AgentState,
    },
}

/// What the host should do with an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Let the request go to the network untouched.
    Passthrough,
    Responded(Resolution),
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Origin the agent controls; requests elsewhere are cross-origin.
    pub scope: Url,
    pub version: CacheVersion,
    pub precache_paths: Vec<String>,
    /// Optional bound on each strategy's network attempt.
    pub strategy_timeout: Option<Duration>,
}

impl AgentConfig {
    pub fn new(scope: Url, version: CacheVersion) -> Self {
        Self {
            scope,
            version,
            precache_paths: DEFAULT_PRECACHE_PATHS.iter().map(|p| p.to_string()).collect(),
            strategy_timeout: None,
        }
    }
}

pub struct OfflineAgent {
    config: AgentConfig,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Fetcher>,
    classifier: RequestClassifier,
    cache_first: CacheFirst,
    network_first: NetworkFirst,
    state: RwLock<AgentState>,
}

impl OfflineAgent {
    pub fn new(config: AgentConfig, store: Arc<dyn CacheStore>, network: Arc<dyn Fetcher>) -> Self {
        let classifier = RequestClassifier::new(&config.version);
        let cache_first =
            CacheFirst::new(store.clone(), network.clone()).with_timeout(config.strategy_timeout);
        let network_first =
            NetworkFirst::new(store.clone(), network.clone()).with_timeout(config.strategy_timeout);
        Self {
            config,
            store,
            network,
            classifier,
            cache_first,
            network_first,
            state: RwLock::new(AgentState::Installing),
        }
    }

    pub async fn state(&self) -> AgentState {
        *self.state.read().await
    }

    pub fn scope(&self) -> &Url {
        &self.config.scope
    }

    pub fn version(&self) -> &CacheVersion {
        &self.config.version
    }

    /// Build an intercepted request for `url` relative to this agent's scope.
    pub fn intercept(&self, method: reqwest::Method, url: Url) -> InterceptedRequest {
        InterceptedRequest::new(method, url, &self.config.scope)
    }

    async fn transition(&self, expected: AgentState, next: AgentState) -> Result<(), AgentError> {
        let mut state = self.state.write().await;
        if *state != expected {
            return Err(AgentError::InvalidState {
                expected,
                actual: *state,
            });
        }
        let from = *state;
        debug!(from = %from, to = %next, "Agent state change");
        *state = next;
        Ok(())
    }

    async fn require(&self, expected: AgentState) -> Result<(), AgentError> {
        let actual = self.state().await;
        if actual != expected {
            return Err(AgentError::InvalidState { expected, actual });
        }
        Ok(())
    }

    /// Precache the app shell into this version's static bucket.
    ///
    /// Any failure leaves the agent `Redundant`; it never becomes active.
    /// A static bucket created by the failed attempt is removed again, so a
    /// later `resume` cannot mistake it for an installed shell.
    pub async fn install(&self) -> Result<(), AgentError> {
        self.require(AgentState::Installing).await?;
        let bucket = self.config.version.bucket(BucketPurpose::Static);

        let result = match self.store.keys().await {
            Ok(existing) => {
                let created = !existing.contains(&bucket);
                let result = self.precache(&bucket).await;
                if result.is_err() && created {
                    self.discard(&bucket).await;
                }
                result
            }
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(count) => {
                info!(bucket = %bucket, entries = count, "Installed, skipping wait");
                self.transition(AgentState::Installing, AgentState::Waiting)
                    .await
            }
            Err(e) => {
                warn!(bucket = %bucket, error = %e, "Install failed");
                *self.state.write().await = AgentState::Redundant;
                Err(e)
            }
        }
    }

    async fn discard(&self, bucket: &str) {
        match self.store.delete(bucket).await {
            Ok(_) => debug!(bucket, "Removed bucket left by failed install"),
            Err(e) => warn!(bucket, error = %e, "Failed to remove bucket after failed install"),
        }
    }

    /// All-or-nothing: every shell path is fetched before anything is stored.
    async fn precache(&self, bucket: &str) -> Result<usize, AgentError> {
        self.store.open(bucket).await?;

        let fetches = self
            .config
            .precache_paths
            .iter()
            .map(|path| self.fetch_shell(path));
        let responses = try_join_all(fetches).await?;

        for (key, response) in &responses {
            self.store.put(bucket, key, response.clone()).await?;
        }
        Ok(responses.len())
    }

    async fn fetch_shell(&self, path: &str) -> Result<(String, HttpResponse), AgentError> {
        let install_error = |reason: String| AgentError::Install {
            path: path.to_string(),
            reason,
        };

        let url = self
            .config
            .scope
            .join(path)
            .map_err(|e| install_error(e.to_string()))?;
        let response = self
            .network
            .fetch(&HttpRequest::get(url.clone()))
            .await
            .map_err(|e| install_error(e.to_string()))?;
        if !response.ok() {
            return Err(install_error(format!("status {}", response.status)));
        }
        Ok((cache_key(&url), response))
    }

    /// Delete every bucket outside the current version, then take control.
    /// Returns the names of the deleted buckets.
    pub async fn activate(&self) -> Result<Vec<String>, AgentError> {
        self.require(AgentState::Waiting).await?;

        let stale: Vec<String> = self
            .store
            .keys()
            .await?
            .into_iter()
            .filter(|name| !self.config.version.owns(name))
            .collect();

        try_join_all(stale.iter().map(|name| self.store.delete(name))).await?;
        for name in &stale {
            info!(bucket = %name, "Deleted stale cache bucket");
        }

        self.transition(AgentState::Waiting, AgentState::Active)
            .await?;
        info!(version = %self.config.version, "Activated, claiming clients");
        Ok(stale)
    }

    /// Install then activate, as the host does for a fresh deploy.
    pub async fn start(&self) -> Result<Vec<String>, AgentError> {
        self.install().await?;
        self.activate().await
    }

    /// Restart an already installed version without reinstalling.
    ///
    /// Returns false (and leaves the agent `Installing`) unless this
    /// version's static bucket holds every precache path.
    pub async fn resume(&self) -> Result<bool, AgentError> {
        self.require(AgentState::Installing).await?;
        let bucket = self.config.version.bucket(BucketPurpose::Static);
        if !self.store.keys().await?.contains(&bucket) {
            return Ok(false);
        }

        let stored = self.store.entries(&bucket).await?;
        let missing = self
            .config
            .precache_paths
            .iter()
            .filter(|path| match self.config.scope.join(path) {
                Ok(url) => !stored.contains(&cache_key(&url)),
                Err(_) => true,
            })
            .count();
        if missing > 0 {
            debug!(bucket = %bucket, missing, "Installed shell is incomplete");
            return Ok(false);
        }

        self.transition(AgentState::Installing, AgentState::Active)
            .await?;
        debug!(version = %self.config.version, "Resumed installed version");
        Ok(true)
    }

    /// Hand control to a newer version. Everything passes through afterwards.
    pub async fn supersede(&self) {
        *self.state.write().await = AgentState::Superseded;
        info!(version = %self.config.version, "Superseded");
    }

    /// Resolve one intercepted request. Never fails: every intercepted
    /// branch produces a concrete response.
    pub async fn fetch(&self, request: &InterceptedRequest) -> FetchOutcome {
        if self.state().await != AgentState::Active {
            return FetchOutcome::Passthrough;
        }

        match self.classifier.classify(request) {
            Route::Ignore => FetchOutcome::Passthrough,
            Route::CacheFirst { bucket } => {
                FetchOutcome::Responded(self.cache_first.handle(&bucket, request).await)
            }
            Route::NetworkFirst { bucket } => {
                FetchOutcome::Responded(self.network_first.handle(&bucket, request).await)
            }
        }
    }
}
