//! Network stubs shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::cache::{CacheError, CacheStore, CachedResponse, MemoryCacheStore};
use crate::net::{FetchError, Fetcher, HttpRequest, HttpResponse};

/// Replays a fixed sequence of outcomes, one per call.
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<HttpResponse, FetchError>>>,
    requested: Mutex<Vec<String>>,
    calls: AtomicUsize,
    hang: bool,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<HttpResponse, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requested: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            hang: false,
        }
    }

    /// A fetcher whose requests never complete.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(request.url.to_string());
        if self.hang {
            futures::future::pending::<()>().await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(FetchError::Network("script exhausted".to_string())))
    }
}

/// Serves fixed responses by URL, with a switch to simulate going offline.
#[derive(Default)]
pub struct RouteFetcher {
    routes: Mutex<HashMap<String, HttpResponse>>,
    offline: AtomicBool,
    hang: AtomicBool,
    calls: AtomicUsize,
}

impl RouteFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, response: HttpResponse) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_hanging(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for RouteFetcher {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Network("offline".to_string()));
        }
        let routed = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        Ok(routed.unwrap_or_else(|| HttpResponse::new(404, "Not Found")))
    }
}

/// Memory store whose operations can be made to fail on demand.
pub struct FlakyStore {
    inner: MemoryCacheStore,
    fail_open: AtomicBool,
    fail_reads: AtomicBool,
    puts: AtomicUsize,
    puts_before_failure: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryCacheStore::new(),
            fail_open: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
            puts_before_failure: AtomicUsize::new(usize::MAX),
        }
    }

    pub fn fail_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Let `count` more puts succeed, then fail every one after.
    pub fn fail_writes_after(&self, count: usize) {
        let done = self.puts.load(Ordering::SeqCst);
        self.puts_before_failure
            .store(done.saturating_add(count), Ordering::SeqCst);
    }

    fn disk_full() -> CacheError {
        CacheError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn open(&self, bucket: &str) -> Result<(), CacheError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(Self::disk_full());
        }
        self.inner.open(bucket).await
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::disk_full());
        }
        self.inner.get(bucket, key).await
    }

    async fn put(&self, bucket: &str, key: &str, response: HttpResponse) -> Result<(), CacheError> {
        let done = self.puts.fetch_add(1, Ordering::SeqCst);
        if done >= self.puts_before_failure.load(Ordering::SeqCst) {
            return Err(Self::disk_full());
        }
        self.inner.put(bucket, key, response).await
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.inner.keys().await
    }

    async fn delete(&self, bucket: &str) -> Result<bool, CacheError> {
        self.inner.delete(bucket).await
    }

    async fn entries(&self, bucket: &str) -> Result<Vec<String>, CacheError> {
        self.inner.entries(bucket).await
    }
}
