//! Disk-backed blob cache keyed by resolved source identifier.

pub mod eviction;

use std::{
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::SystemTime,
};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, warn};

pub use eviction::{EvictionPolicy, LruSizeCap, Unbounded};

use crate::common::{AudioFormat, SourceId};

const STAGING_DIR: &str = ".staging";

/// File name of a cached blob, `<source-id>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns `None` when the identifier cannot be used as a plain file name.
    pub fn for_source(source: &SourceId, format: AudioFormat) -> Option<Self> {
        Self::from_file_name(&format!("{}.{}", source, format.as_ext()))
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains("..")
            && !name.contains(['/', '\\', '\0']);
        valid.then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CacheUsage {
    pub entries: u64,
    pub bytes: u64,
}

pub struct DiskCache {
    root: PathBuf,
    policy: Box<dyn EvictionPolicy>,
    tmp_counter: AtomicU64,
}

impl DiskCache {
    /// The root directory is created lazily on the first write.
    pub fn new(root: impl Into<PathBuf>, policy: Box<dyn EvictionPolicy>) -> Self {
        Self {
            root: root.into(),
            policy,
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Scratch space for downloads that have not been promoted yet.
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    pub async fn exists(&self, key: &CacheKey) -> bool {
        tokio::fs::try_exists(self.path_for(key))
            .await
            .unwrap_or(false)
    }

    pub async fn read(&self, key: &CacheKey) -> io::Result<Bytes> {
        let data = tokio::fs::read(self.path_for(key)).await?;
        self.policy.record_access(key);
        Ok(Bytes::from(data))
    }

    /// Stores `blob` under `key`, replacing any previous content.
    ///
    /// The blob is written to a staging file and renamed into place, so a
    /// concurrent reader sees either the old file, no file, or the full blob.
    pub async fn write(&self, key: &CacheKey, blob: &[u8]) -> io::Result<()> {
        let staging = self.staging_dir();
        tokio::fs::create_dir_all(&staging).await?;

        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = staging.join(format!("{}.{}.{}.tmp", key, std::process::id(), n));
        if let Err(e) = tokio::fs::write(&tmp, blob).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&tmp, self.path_for(key)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }

        debug!("Cached {} ({} bytes)", key, blob.len());
        self.policy.record_insert(key, blob.len() as u64);
        self.evict(key).await;
        Ok(())
    }

    pub async fn remove(&self, key: &CacheKey) -> io::Result<bool> {
        self.policy.record_remove(key);
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn evict(&self, keep: &CacheKey) {
        for victim in self.policy.victims(keep) {
            match tokio::fs::remove_file(self.path_for(&victim)).await {
                Ok(()) => debug!("Evicted {} ({} policy)", victim, self.policy.name()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to evict {}: {}", victim, e),
            }
        }
    }

    async fn entries(&self) -> io::Result<Vec<(CacheKey, u64, SystemTime)>> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let Some(key) = entry.file_name().to_str().and_then(CacheKey::from_file_name) else {
                continue;
            };
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((key, meta.len(), modified));
        }
        Ok(entries)
    }

    /// Registers blobs left by a previous run with the eviction policy,
    /// oldest first, and clears stale staging files.
    pub async fn seed(&self) -> io::Result<usize> {
        let mut entries = self.entries().await?;
        entries.sort_by_key(|(_, _, modified)| *modified);

        let count = entries.len();
        if let Some((newest, _, _)) = entries.last().cloned() {
            for (key, size, _) in &entries {
                self.policy.record_insert(key, *size);
            }
            self.evict(&newest).await;
        }

        match tokio::fs::remove_dir_all(self.staging_dir()).await {
            Ok(()) => debug!("Cleared stale staging directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to clear staging directory: {}", e),
        }

        Ok(count)
    }

    pub async fn usage(&self) -> io::Result<CacheUsage> {
        let entries = self.entries().await?;
        Ok(CacheUsage {
            entries: entries.len() as u64,
            bytes: entries.iter().map(|(_, size, _)| size).sum(),
        })
    }
}
