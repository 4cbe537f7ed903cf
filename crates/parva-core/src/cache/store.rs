use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::HttpResponse;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown cache bucket: {0}")]
    UnknownBucket(String),

    #[error("Invalid cache bucket name: {0}")]
    InvalidBucketName(String),
}

/// A stored response and when it was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub response: HttpResponse,
    pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn new(response: HttpResponse) -> Self {
        Self {
            response,
            stored_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.stored_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Named buckets of request identity → stored response.
///
/// Implementations serialize access internally; callers share one store
/// behind an `Arc` across concurrently handled requests.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create `bucket` if it does not exist yet.
    async fn open(&self, bucket: &str) -> Result<(), CacheError>;

    /// Look up `key` in `bucket`. A missing bucket is a miss.
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CachedResponse>, CacheError>;

    /// Store `response` under `key`, creating the bucket on first use.
    async fn put(&self, bucket: &str, key: &str, response: HttpResponse) -> Result<(), CacheError>;

    /// Names of all existing buckets.
    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Delete a whole bucket. Returns whether it existed.
    async fn delete(&self, bucket: &str) -> Result<bool, CacheError>;

    /// Request keys stored in `bucket`.
    async fn entries(&self, bucket: &str) -> Result<Vec<String>, CacheError>;
}
