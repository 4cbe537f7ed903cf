//! Retrying client for the versioned Parva REST API.
//!
//! Every attempt is bounded by a timeout and raced against an optional
//! abort signal. Transient failures (connection loss, timeouts, 5xx) are
//! retried sequentially with exponential backoff; everything else fails
//! immediately. Successful payloads go through the envelope normalizer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::envelope::{self, ResponseEnvelope};
use crate::net::{FetchError, Fetcher, HttpRequest, HttpResponse, ReqwestFetcher};

use super::{AbortSignal, Params, RequestError};

// ============================================================================
// Constants
// ============================================================================

/// Default API base, versioned per deploy.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/v5/api";

/// Retries after the first attempt for transient failures.
pub const DEFAULT_RETRIES: u32 = 2;

/// Base backoff; attempt `n` waits `base * 2^n`.
pub const DEFAULT_BACKOFF_MS: u64 = 250;

/// Per-attempt timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Retry bound and backoff schedule. No jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPlan {
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPlan {
    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self { retries, backoff }
    }

    /// Delay before retrying after failed attempt `attempt` (0-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }

    pub fn total_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for RetryPlan {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

/// API client for Parva.
/// Clone is cheap - the fetcher is shared behind an Arc.
#[derive(Clone)]
pub struct ApiClient {
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
    plan: RetryPlan,
    timeout: Duration,
}

impl ApiClient {
    /// Create a client with default settings over reqwest
    pub fn new() -> Result<Self> {
        Ok(Self::with_fetcher(Arc::new(ReqwestFetcher::new()?)))
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new()?
            .with_base_url(&config.api_base)
            .with_retry_plan(RetryPlan::new(
                config.retries,
                Duration::from_millis(config.backoff_ms),
            ))
            .with_timeout(Duration::from_secs(config.timeout_secs)))
    }

    /// Create a client over any network implementation, with default settings.
    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            base_url: DEFAULT_BASE_URL.to_string(),
            plan: RetryPlan::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_plan(mut self, plan: RetryPlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.plan.retries = retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.plan.backoff = backoff;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_plan(&self) -> RetryPlan {
        self.plan
    }

    /// GET `path` relative to the base URL and normalize the response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &Params,
    ) -> Result<ResponseEnvelope<T>, RequestError> {
        self.send(path, params, None).await
    }

    /// Like [`get`](Self::get), but gives up with `RequestError::Aborted`
    /// as soon as `signal` fires, including during backoff.
    pub async fn get_with_signal<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &Params,
        signal: &AbortSignal,
    ) -> Result<ResponseEnvelope<T>, RequestError> {
        self.send(path, params, Some(signal)).await
    }

    fn build_url(&self, path: &str, params: &Params) -> Result<Url, RequestError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))?;
        params.apply(&mut url);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &Params,
        signal: Option<&AbortSignal>,
    ) -> Result<ResponseEnvelope<T>, RequestError> {
        let url = self.build_url(path, params)?;
        let request = HttpRequest::get(url).with_header("accept", "application/json");

        let mut attempt = 0;
        loop {
            let err = match self.attempt(&request, signal).await {
                Ok(response) if response.ok() => return Self::decode(&request.url, &response),
                Ok(response) => RequestError::from_status(response.status, &response.text()),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= self.plan.retries {
                debug!(url = %request.url, attempts = attempt + 1, error = %err, "Request failed");
                return Err(err);
            }

            let backoff = self.plan.delay(attempt);
            warn!(
                url = %request.url,
                retry = attempt + 1,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "Transient failure, backing off"
            );
            Self::sleep(backoff, signal).await?;
            attempt += 1;
        }
    }

    /// One round trip, bounded by the timeout and the abort signal.
    async fn attempt(
        &self,
        request: &HttpRequest,
        signal: Option<&AbortSignal>,
    ) -> Result<HttpResponse, RequestError> {
        let bounded = tokio::time::timeout(self.timeout, self.fetcher.fetch(request));
        let outcome = match signal {
            Some(signal) => {
                if signal.is_aborted() {
                    return Err(RequestError::Aborted);
                }
                tokio::select! {
                    biased;
                    _ = signal.aborted() => return Err(RequestError::Aborted),
                    outcome = bounded => outcome,
                }
            }
            None => bounded.await,
        };

        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(FetchError::Network(message))) => {
                Err(RequestError::NetworkUnavailable { message })
            }
            Ok(Err(FetchError::Timeout)) | Err(_) => Err(RequestError::Timeout {
                after: self.timeout,
            }),
        }
    }

    async fn sleep(delay: Duration, signal: Option<&AbortSignal>) -> Result<(), RequestError> {
        match signal {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.aborted() => Err(RequestError::Aborted),
                _ = tokio::time::sleep(delay) => Ok(()),
            },
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    fn decode<T: DeserializeOwned>(
        url: &Url,
        response: &HttpResponse,
    ) -> Result<ResponseEnvelope<T>, RequestError> {
        let payload: Value = response.json().map_err(|e| {
            RequestError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })?;
        envelope::normalize_into(payload).map_err(|e| {
            RequestError::InvalidResponse(format!("Unexpected data shape from {}: {}", url, e))
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AbortController;
    use crate::envelope::ConfidenceLevel;
    use crate::testing::ScriptedFetcher;
    use serde_json::json;

    fn client(fetcher: &Arc<ScriptedFetcher>, retries: u32) -> ApiClient {
        ApiClient::with_fetcher(fetcher.clone())
            .with_base_url("http://parva.test/v5/api/")
            .with_retries(retries)
            .with_backoff(Duration::from_millis(100))
    }

    fn ok_body() -> HttpResponse {
        HttpResponse::json_body(200, &json!({"festivals": [], "total": 0})).unwrap()
    }

    #[test]
    fn test_retry_plan_delay_doubles() {
        let plan = RetryPlan::new(3, Duration::from_millis(250));
        assert_eq!(plan.delay(0), Duration::from_millis(250));
        assert_eq!(plan.delay(1), Duration::from_millis(500));
        assert_eq!(plan.delay(2), Duration::from_millis(1000));
        assert_eq!(plan.total_attempts(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_two_server_errors() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(HttpResponse::new(500, "boom")),
            Ok(HttpResponse::new(500, "boom")),
            Ok(ok_body()),
        ]));

        let envelope: ResponseEnvelope<Value> = client(&fetcher, 2)
            .get("/festivals/upcoming", &Params::new())
            .await
            .unwrap();

        assert_eq!(fetcher.calls(), 3);
        assert_eq!(envelope.data["total"], 0);
        assert_eq!(envelope.meta.confidence.level, ConfidenceLevel::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_when_retries_exhausted() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(HttpResponse::new(500, "boom")),
            Ok(HttpResponse::new(500, "boom")),
            Ok(ok_body()),
        ]));

        let err = client(&fetcher, 1)
            .get::<Value>("/festivals/upcoming", &Params::new())
            .await
            .unwrap_err();

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(err.status_code(), Some(500));
        assert!(matches!(err, RequestError::ServerError { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_never_retried() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(HttpResponse::new(404, r#"{"detail": "Festival not found"}"#)),
            Ok(ok_body()),
        ]));

        let err = client(&fetcher, 5)
            .get::<Value>("/festivals/unknown", &Params::new())
            .await
            .unwrap_err();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.detail().and_then(|d| d.message()), Some("Festival not found"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failures_are_retried() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Err(FetchError::Network("connection refused".to_string())),
            Ok(ok_body()),
        ]));

        let result = client(&fetcher, 2)
            .get::<Value>("/calendar/today", &Params::new())
            .await;

        assert!(result.is_ok());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_waits_between_attempts() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Ok(HttpResponse::new(502, "")),
            Ok(HttpResponse::new(503, "")),
            Ok(ok_body()),
        ]));

        let start = tokio::time::Instant::now();
        client(&fetcher, 2)
            .get::<Value>("/calendar/today", &Params::new())
            .await
            .unwrap();

        // 100ms after the first failure, 200ms after the second
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempt_times_out() {
        let fetcher = Arc::new(ScriptedFetcher::hanging());

        let err = client(&fetcher, 0)
            .with_timeout(Duration::from_secs(2))
            .get::<Value>("/calendar/today", &Params::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RequestError::Timeout { after } if after == Duration::from_secs(2)));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_stops_retry_loop() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(HttpResponse::new(500, ""))]));
        let controller = AbortController::new();
        let signal = controller.signal();
        let api = client(&fetcher, 3).with_backoff(Duration::from_secs(60));

        let call = tokio::spawn(async move {
            api.get_with_signal::<Value>("/calendar/today", &Params::new(), &signal)
                .await
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        controller.abort();

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, RequestError::Aborted));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_query_is_built_from_params() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(ok_body())]));

        client(&fetcher, 0)
            .get::<Value>(
                "/observances",
                &Params::new()
                    .set("date", "2026-10-19")
                    .set_opt("preferences", None::<&str>),
            )
            .await
            .unwrap();

        assert_eq!(
            fetcher.requested_urls(),
            vec!["http://parva.test/v5/api/observances?date=2026-10-19".to_string()]
        );
    }

    #[tokio::test]
    async fn test_non_json_success_is_invalid_response() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(HttpResponse::new(200, "<html>"))]));

        let err = client(&fetcher, 2)
            .get::<Value>("/calendar/today", &Params::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RequestError::InvalidResponse(_)));
        assert_eq!(fetcher.calls(), 1);
    }
}
