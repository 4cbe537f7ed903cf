use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketPurpose {
    /// App shell and other same-origin assets
    Static,
    /// Last known-good API payloads
    Api,
}

impl BucketPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketPurpose::Static => "static",
            BucketPurpose::Api => "api",
        }
    }
}

impl fmt::Display for BucketPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `<prefix>-<version>` stem shared by every bucket of one deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheVersion {
    prefix: String,
    version: String,
}

impl CacheVersion {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            version: version.into(),
        }
    }

    pub fn stem(&self) -> String {
        format!("{}-{}", self.prefix, self.version)
    }

    pub fn bucket(&self, purpose: BucketPurpose) -> String {
        format!("{}-{}", self.stem(), purpose)
    }

    /// Whether `bucket_name` belongs to this version. The stem must be
    /// followed by `-` or end the name, so `parva-v50-api` is not `parva-v5`.
    pub fn owns(&self, bucket_name: &str) -> bool {
        match bucket_name.strip_prefix(&self.stem()) {
            Some(rest) => rest.is_empty() || rest.starts_with('-'),
            None => false,
        }
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}
