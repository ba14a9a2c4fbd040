//! In-process catalog and resolver fakes shared by unit tests.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Map;

use super::{
    AudioResolver, CatalogService,
    spotify::models::{AlbumRef, ArtistRef, CatalogAlbum, CatalogArtist, CatalogTrack, Image},
};
use crate::common::{AudioFormat, CatalogError, ResolverError, SourceId, SourceMatch};

pub fn track(id: &str, name: &str, artist: &str) -> CatalogTrack {
    CatalogTrack {
        id: id.to_string(),
        name: name.to_string(),
        duration_ms: 200_000,
        artists: vec![ArtistRef {
            id: Some(format!("artist-{}", artist)),
            name: artist.to_string(),
        }],
        album: Some(AlbumRef {
            id: Some("album".into()),
            name: "Album".into(),
            images: vec![Image {
                url: format!("https://img.test/{}", id),
                height: Some(640),
                width: Some(640),
            }],
        }),
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    pub tracks: HashMap<String, CatalogTrack>,
    pub artists: HashMap<String, CatalogArtist>,
    pub albums: HashMap<String, Vec<CatalogAlbum>>,
    pub lookups: AtomicUsize,
}

impl FakeCatalog {
    pub fn with_track(mut self, track: CatalogTrack) -> Self {
        self.tracks.insert(track.id.clone(), track);
        self
    }

    pub fn with_artist(mut self, id: &str, name: &str) -> Self {
        self.artists.insert(
            id.to_string(),
            CatalogArtist {
                id: id.to_string(),
                name: name.to_string(),
                images: Vec::new(),
                extra: Map::new(),
            },
        );
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogService for FakeCatalog {
    fn name(&self) -> &str {
        "fake-catalog"
    }

    async fn track(&self, id: &str) -> Result<CatalogTrack, CatalogError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.tracks
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("tracks/{}", id)))
    }

    async fn artist(&self, id: &str) -> Result<CatalogArtist, CatalogError> {
        self.artists
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("artists/{}", id)))
    }

    async fn artist_top_tracks(&self, id: &str) -> Result<Vec<CatalogTrack>, CatalogError> {
        if !self.artists.contains_key(id) {
            return Err(CatalogError::NotFound(format!("artists/{}/top-tracks", id)));
        }
        let mut tracks: Vec<_> = self.tracks.values().cloned().collect();
        tracks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tracks)
    }

    async fn artist_albums(&self, id: &str) -> Result<Vec<CatalogAlbum>, CatalogError> {
        self.albums
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("artists/{}/albums", id)))
    }

    async fn search_tracks(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        let mut found: Vec<_> = self
            .tracks
            .values()
            .filter(|t| t.name.contains(query))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found.truncate(limit);
        Ok(found)
    }
}

/// Maps queries to ids and "downloads" a fixed payload.
#[derive(Default)]
pub struct FakeAudio {
    pub results: HashMap<String, SourceId>,
    pub payload: Vec<u8>,
    pub download_error: Option<String>,
    pub download_delay: Duration,
    pub searches: AtomicUsize,
    pub downloads: AtomicUsize,
    pub downloaded: Mutex<Vec<SourceMatch>>,
}

impl FakeAudio {
    pub fn new(payload: &[u8]) -> Self {
        Self {
            payload: payload.to_vec(),
            ..Self::default()
        }
    }

    pub fn with_result(mut self, query: &str, id: &str) -> Self {
        self.results.insert(query.to_string(), SourceId::from(id));
        self
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioResolver for FakeAudio {
    fn name(&self) -> &str {
        "fake-audio"
    }

    async fn search(&self, query: &str) -> Result<Option<SourceId>, ResolverError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.get(query).cloned())
    }

    async fn download(
        &self,
        source: &SourceMatch,
        dest_dir: &Path,
        format: AudioFormat,
    ) -> Result<PathBuf, ResolverError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.downloaded.lock().push(source.clone());
        if !self.download_delay.is_zero() {
            tokio::time::sleep(self.download_delay).await;
        }
        if let Some(message) = &self.download_error {
            return Err(ResolverError::Exit {
                program: "fake".into(),
                code: 1,
                stderr: message.clone(),
            });
        }

        let path = dest_dir.join(format!("{}.{}", source.source_id, format.as_ext()));
        tokio::fs::write(&path, &self.payload)
            .await
            .map_err(|e| ResolverError::Output(e.to_string()))?;
        Ok(path)
    }
}
