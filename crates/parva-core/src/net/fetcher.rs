use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use super::{HttpRequest, HttpResponse};

/// Connection-level failure. HTTP error statuses are not failures here;
/// they come back as an [`HttpResponse`] like any other.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Network request timed out")]
    Timeout,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Pluggable network implementation.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError>;
}

/// Production fetcher backed by reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
///
/// No client-level timeout is set: the API client bounds each attempt
/// itself and the cache strategies carry their own optional bound.
#[derive(Clone, Debug)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(url = %request.url, status, bytes = body.len(), "Fetched");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
