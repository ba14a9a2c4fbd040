use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name of the cache directory created under the platform temp dir.
pub const DEFAULT_CACHE_DIR_NAME: &str = "spotifydl-cache";

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EvictionKind {
    /// Never remove anything.
    #[default]
    Unbounded,
    /// Remove least recently used blobs once `max_size_mb` is exceeded.
    Lru,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub eviction: EvictionKind,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
    /// Lifetime of a memoized catalog id to source id mapping. `0` disables it.
    #[serde(default = "default_resolution_ttl_secs")]
    pub resolution_ttl_secs: u64,
}

fn default_max_size_mb() -> u64 {
    2048
}

fn default_resolution_ttl_secs() -> u64 {
    3600
}

impl CacheConfig {
    pub fn root(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME))
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            eviction: EvictionKind::default(),
            max_size_mb: default_max_size_mb(),
            resolution_ttl_secs: default_resolution_ttl_secs(),
        }
    }
}
