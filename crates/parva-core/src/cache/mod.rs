//! Versioned cache buckets for offline access.
//!
//! This module provides the `CacheStore` interface the offline agent reads
//! and writes through, with two implementations:
//! - `MemoryCacheStore`: process-local, used by tests and short-lived hosts
//! - `DiskCacheStore`: one JSON file per bucket under the cache directory
//!
//! Bucket names follow `<prefix>-<version>-<purpose>`, e.g. `parva-v5-static`.

pub mod bucket;
pub mod disk;
pub mod memory;
pub mod store;

pub use bucket::{BucketPurpose, CacheVersion};
pub use disk::DiskCacheStore;
pub use memory::MemoryCacheStore;
pub use store::{CacheError, CacheStore, CachedResponse};
