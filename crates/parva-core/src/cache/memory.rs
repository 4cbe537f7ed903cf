use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::net::HttpResponse;

use super::{CacheError, CacheStore, CachedResponse};

type Bucket = HashMap<String, CachedResponse>;

/// In-process cache store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    buckets: RwLock<BTreeMap<String, Bucket>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn open(&self, bucket: &str) -> Result<(), CacheError> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        let buckets = self.buckets.read().await;
        Ok(buckets.get(bucket).and_then(|b| b.get(key)).cloned())
    }

    async fn put(&self, bucket: &str, key: &str, response: HttpResponse) -> Result<(), CacheError> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), CachedResponse::new(response));
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.buckets.read().await.keys().cloned().collect())
    }

    async fn delete(&self, bucket: &str) -> Result<bool, CacheError> {
        Ok(self.buckets.write().await.remove(bucket).is_some())
    }

    async fn entries(&self, bucket: &str) -> Result<Vec<String>, CacheError> {
        let buckets = self.buckets.read().await;
        let mut keys: Vec<String> = buckets
            .get(bucket)
            .ok_or_else(|| CacheError::UnknownBucket(bucket.to_string()))?
            .keys()
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
