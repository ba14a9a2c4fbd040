use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::common::{AudioFormat, CatalogError, ResolverError, SourceId, SourceMatch};

use super::spotify::models::{CatalogAlbum, CatalogArtist, CatalogTrack};

/// Read-only access to the music catalog.
///
/// Every call goes upstream; implementations keep no metadata cache.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Short name used in logs (e.g. "spotify").
    fn name(&self) -> &str;

    async fn track(&self, id: &str) -> Result<CatalogTrack, CatalogError>;

    async fn artist(&self, id: &str) -> Result<CatalogArtist, CatalogError>;

    async fn artist_top_tracks(&self, id: &str) -> Result<Vec<CatalogTrack>, CatalogError>;

    async fn artist_albums(&self, id: &str) -> Result<Vec<CatalogAlbum>, CatalogError>;

    async fn search_tracks(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>, CatalogError>;
}

/// Finds downloadable media for a free-text query and fetches its audio.
#[async_trait]
pub trait AudioResolver: Send + Sync {
    fn name(&self) -> &str;

    /// Best match for `query`, or `None` when the search came back empty.
    async fn search(&self, query: &str) -> Result<Option<SourceId>, ResolverError>;

    /// Downloads the audio of `source` into `dest_dir` encoded as `format`
    /// and returns the path of the produced file.
    async fn download(
        &self,
        source: &SourceMatch,
        dest_dir: &Path,
        format: AudioFormat,
    ) -> Result<PathBuf, ResolverError>;
}
