use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    cache::{CacheKey, DiskCache},
    common::{AudioFormat, FetchError, ResolverError, Shared, SourceMatch},
    resolver::SourceResolver,
};

/// Resolves a catalog id to audio bytes, downloading into the disk cache on a miss.
///
/// Concurrent misses for the same cache key share one download: the first
/// caller holds the key's lock while downloading and late arrivals re-check
/// the cache once it is released.
pub struct TrackFetcher {
    resolver: SourceResolver,
    cache: Arc<DiskCache>,
    format: AudioFormat,
    inflight: DashMap<CacheKey, Shared<()>>,
}

/// A caller's share of the per-key download lock. Dropping it, on return or
/// cancellation, removes the map entry once no other caller holds it.
struct InflightSlot<'a> {
    map: &'a DashMap<CacheKey, Shared<()>>,
    key: CacheKey,
    lock: Shared<()>,
}

impl<'a> InflightSlot<'a> {
    fn claim(map: &'a DashMap<CacheKey, Shared<()>>, key: CacheKey) -> Self {
        let lock = map
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self { map, key, lock }
    }
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        // The map's reference plus ours.
        self.map
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 2);
    }
}

impl TrackFetcher {
    pub fn new(resolver: SourceResolver, cache: Arc<DiskCache>, format: AudioFormat) -> Self {
        Self {
            resolver,
            cache,
            format,
            inflight: DashMap::new(),
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn cache(&self) -> &Arc<DiskCache> {
        &self.cache
    }

    pub async fn fetch(&self, catalog_id: &str) -> Result<Bytes, FetchError> {
        let found = self.resolver.resolve(catalog_id).await?;
        let key = CacheKey::for_source(&found.source_id, self.format).ok_or_else(|| {
            FetchError::Resolution {
                query: found.query.clone(),
                source: ResolverError::Output(format!(
                    "source id '{}' is not a usable file name",
                    found.source_id
                )),
            }
        })?;

        if let Some(blob) = self.cached(&key).await? {
            debug!("Cache hit for {} ({})", catalog_id, key);
            return Ok(blob);
        }

        let slot = InflightSlot::claim(&self.inflight, key);
        let _guard = slot.lock.lock().await;
        match self.cached(&slot.key).await? {
            Some(blob) => {
                debug!("{} was downloaded by a concurrent request", slot.key);
                Ok(blob)
            }
            None => self.download(&found, &slot.key).await,
        }
    }

    async fn cached(&self, key: &CacheKey) -> Result<Option<Bytes>, FetchError> {
        match self.cache.read(key).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn download(&self, found: &SourceMatch, key: &CacheKey) -> Result<Bytes, FetchError> {
        let staging = self.cache.staging_dir();
        tokio::fs::create_dir_all(&staging).await?;

        info!("Cache miss for {}, downloading '{}'", key, found.query);
        let produced = self
            .resolver
            .audio()
            .download(found, &staging, self.format)
            .await
            .map_err(|e| FetchError::Download(e.to_string()))?;

        let read = tokio::fs::read(&produced).await;
        if let Err(e) = tokio::fs::remove_file(&produced).await {
            warn!("Failed to remove staged file {}: {}", produced.display(), e);
        }
        let blob = Bytes::from(read?);

        self.cache.write(key, &blob).await?;
        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        cache::Unbounded,
        common::SourceId,
        sources::testing::{FakeAudio, FakeCatalog, track},
    };

    struct Harness {
        _dir: tempfile::TempDir,
        audio: Arc<FakeAudio>,
        cache: Arc<DiskCache>,
        fetcher: TrackFetcher,
    }

    fn harness(audio: FakeAudio) -> Harness {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = FakeCatalog::default()
            .with_track(track("sp1", "Song", "Artist"))
            .with_track(track("sp2", "Lost", "Nobody"));
        let audio = Arc::new(audio.with_result("Song Artist", "yt1"));
        let cache = Arc::new(DiskCache::new(dir.path(), Box::new(Unbounded)));
        let resolver = SourceResolver::new(Arc::new(catalog), audio.clone(), Duration::ZERO);
        let fetcher = TrackFetcher::new(resolver, cache.clone(), AudioFormat::Mp3);
        Harness {
            _dir: dir,
            audio,
            cache,
            fetcher,
        }
    }

    fn yt1() -> CacheKey {
        CacheKey::for_source(&SourceId::from("yt1"), AudioFormat::Mp3).expect("key")
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let h = harness(FakeAudio::new(b"ID3 payload"));

        let first = h.fetcher.fetch("sp1").await.expect("first fetch");
        let second = h.fetcher.fetch("sp1").await.expect("second fetch");

        assert_eq!(first, second);
        assert_eq!(&first[..], b"ID3 payload");
        assert_eq!(h.audio.downloads(), 1);
        assert!(h.cache.exists(&yt1()).await);
    }

    #[tokio::test]
    async fn downloader_gets_query_and_id_and_staging_is_cleaned() {
        let h = harness(FakeAudio::new(b"x"));
        h.fetcher.fetch("sp1").await.expect("fetch");

        let calls = h.audio.downloaded.lock().clone();
        assert_eq!(
            calls,
            vec![SourceMatch {
                source_id: SourceId::from("yt1"),
                query: "Song Artist".into(),
            }]
        );
        assert!(!h.cache.staging_dir().join("yt1.mp3").exists());
    }

    #[tokio::test]
    async fn concurrent_misses_download_once() {
        let h = harness(FakeAudio {
            download_delay: Duration::from_millis(100),
            ..FakeAudio::new(b"shared")
        });

        let (a, b) = tokio::join!(h.fetcher.fetch("sp1"), h.fetcher.fetch("sp1"));
        let (a, b) = (a.expect("a"), b.expect("b"));

        assert_eq!(a, b);
        assert_eq!(h.audio.downloads(), 1);
        assert!(h.fetcher.inflight.is_empty());
    }

    #[tokio::test]
    async fn cancelled_fetch_releases_inflight_slot() {
        let h = harness(FakeAudio {
            download_delay: Duration::from_secs(5),
            ..FakeAudio::new(b"slow")
        });

        let outcome =
            tokio::time::timeout(Duration::from_millis(100), h.fetcher.fetch("sp1")).await;
        assert!(outcome.is_err());
        assert!(h.fetcher.inflight.is_empty());
        assert!(!h.cache.exists(&yt1()).await);
    }

    #[tokio::test]
    async fn resolution_failure_writes_nothing() {
        let h = harness(FakeAudio::new(b"x"));

        let err = h.fetcher.fetch("sp2").await.expect_err("no match");
        assert_eq!(err.kind(), "resolution");
        assert_eq!(h.audio.downloads(), 0);
        assert_eq!(h.cache.usage().await.expect("usage").entries, 0);
    }

    #[tokio::test]
    async fn download_failure_carries_tool_message() {
        let h = harness(FakeAudio {
            download_error: Some("ERROR: Video unavailable".into()),
            ..FakeAudio::new(b"")
        });

        let err = h.fetcher.fetch("sp1").await.expect_err("download fails");
        assert_eq!(err.kind(), "download");
        assert!(err.to_string().contains("Video unavailable"));
        assert!(!h.cache.exists(&yt1()).await);
        assert!(h.fetcher.inflight.is_empty());
    }
}
