use std::sync::Arc;

use futures::future::try_join;
use serde::Serialize;
use tracing::debug;

use crate::{
    common::CatalogError,
    sources::{
        CatalogService,
        spotify::models::{CatalogAlbum, CatalogArtist, CatalogTrack},
    },
};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SongSummary {
    pub name: String,
    pub song_id: String,
    pub image: Option<String>,
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl SongSummary {
    fn from_track(track: &CatalogTrack) -> Self {
        Self {
            name: track.name.clone(),
            song_id: track.id.clone(),
            image: track.artwork_url().map(str::to_string),
            author: track.primary_artist().map(str::to_string),
            duration: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlbumSummary {
    pub name: String,
    pub album_id: String,
    pub image: Option<String>,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
}

impl From<CatalogAlbum> for AlbumSummary {
    fn from(album: CatalogAlbum) -> Self {
        Self {
            image: album.images.first().map(|i| i.url.clone()),
            name: album.name,
            album_id: album.id,
            release_date: album.release_date,
            total_tracks: album.total_tracks,
        }
    }
}

/// Shapes catalog responses for the HTTP routes. Nothing is cached.
pub struct CatalogFacade {
    catalog: Arc<dyn CatalogService>,
    search_limit: usize,
}

impl CatalogFacade {
    pub fn new(catalog: Arc<dyn CatalogService>, search_limit: usize) -> Self {
        Self {
            catalog,
            search_limit,
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SongSummary>, CatalogError> {
        debug!("Searching {} for '{}'", self.catalog.name(), query);
        let tracks = self.catalog.search_tracks(query, self.search_limit).await?;
        Ok(tracks.iter().map(SongSummary::from_track).collect())
    }

    pub async fn artist(&self, id: &str) -> Result<CatalogArtist, CatalogError> {
        self.catalog.artist(id).await
    }

    /// Top tracks credited to the artist's own name, with durations.
    pub async fn top_tracks(&self, artist_id: &str) -> Result<Vec<SongSummary>, CatalogError> {
        let (artist, tracks) = try_join(
            self.catalog.artist(artist_id),
            self.catalog.artist_top_tracks(artist_id),
        )
        .await?;

        Ok(tracks
            .iter()
            .map(|t| SongSummary {
                author: Some(artist.name.clone()),
                duration: Some(t.duration_ms),
                ..SongSummary::from_track(t)
            })
            .collect())
    }

    pub async fn albums(&self, artist_id: &str) -> Result<Vec<AlbumSummary>, CatalogError> {
        let albums = self.catalog.artist_albums(artist_id).await?;
        Ok(albums.into_iter().map(AlbumSummary::from).collect())
    }
}
