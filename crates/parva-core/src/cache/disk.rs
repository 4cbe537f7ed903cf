use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::net::HttpResponse;

use super::{CacheError, CacheStore, CachedResponse};

const BUCKET_EXTENSION: &str = "json";

type BucketFile = BTreeMap<String, CachedResponse>;

/// Cache store persisted as one JSON file per bucket.
///
/// A single lock serializes every read-modify-write so concurrent `put`s to
/// the same bucket cannot lose each other's entries.
#[derive(Debug)]
pub struct DiskCacheStore {
    cache_dir: PathBuf,
    lock: Mutex<()>,
}

impl DiskCacheStore {
    pub fn new(cache_dir: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            lock: Mutex::new(()),
        })
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf, CacheError> {
        let valid = !bucket.is_empty()
            && bucket
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !bucket.starts_with('.');
        if !valid {
            return Err(CacheError::InvalidBucketName(bucket.to_string()));
        }
        Ok(self
            .cache_dir
            .join(format!("{}.{}", bucket, BUCKET_EXTENSION)))
    }

    async fn load(&self, bucket: &str) -> Result<Option<BucketFile>, CacheError> {
        let path = self.bucket_path(bucket)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, bucket: &str, entries: &BucketFile) -> Result<(), CacheError> {
        let path = self.bucket_path(bucket)?;
        let contents = serde_json::to_string(entries)?;
        // Write then rename so a crash never leaves a half-written bucket
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    async fn open(&self, bucket: &str) -> Result<(), CacheError> {
        let _guard = self.lock.lock().await;
        if self.load(bucket).await?.is_none() {
            debug!(bucket, "Creating cache bucket");
            self.save(bucket, &BucketFile::new()).await?;
        }
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load(bucket)
            .await?
            .and_then(|mut entries| entries.remove(key)))
    }

    async fn put(&self, bucket: &str, key: &str, response: HttpResponse) -> Result<(), CacheError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load(bucket).await?.unwrap_or_default();
        entries.insert(key.to_string(), CachedResponse::new(response));
        self.save(bucket, &entries).await
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let _guard = self.lock.lock().await;
        let mut names = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.cache_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BUCKET_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, bucket: &str) -> Result<bool, CacheError> {
        let _guard = self.lock.lock().await;
        let path = self.bucket_path(bucket)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn entries(&self, bucket: &str) -> Result<Vec<String>, CacheError> {
        let _guard = self.lock.lock().await;
        let entries = self
            .load(bucket)
            .await?
            .ok_or_else(|| CacheError::UnknownBucket(bucket.to_string()))?;
        Ok(entries.into_keys().collect())
    }
}
