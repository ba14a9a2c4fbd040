use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{
    models::{
        CatalogAlbum, CatalogArtist, CatalogTrack, ErrorEnvelope, Paging, SearchResponse,
        TopTracksResponse,
    },
    token::SpotifyTokenTracker,
};
use crate::{
    common::{CatalogError, HttpClient},
    configs::SpotifyConfig,
    sources::CatalogService,
};

/// Spotify Web API client.
pub struct SpotifyCatalog {
    client: reqwest::Client,
    api_base: Url,
    market: String,
    token_tracker: Arc<SpotifyTokenTracker>,
}

impl SpotifyCatalog {
    pub fn new(config: &SpotifyConfig) -> Result<Self, String> {
        let client = HttpClient::with_timeout(Duration::from_secs(config.request_timeout_secs))
            .map_err(|e| e.to_string())?;
        let token_tracker = Arc::new(SpotifyTokenTracker::new(client.clone(), config));
        Self::with_tracker(client, config, token_tracker)
    }

    pub fn with_tracker(
        client: reqwest::Client,
        config: &SpotifyConfig,
        token_tracker: Arc<SpotifyTokenTracker>,
    ) -> Result<Self, String> {
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| format!("invalid spotify api_base '{}': {}", config.api_base, e))?;
        if api_base.cannot_be_a_base() {
            return Err(format!("spotify api_base '{}' is not a base URL", config.api_base));
        }

        Ok(Self {
            client,
            api_base,
            market: config.market.clone(),
            token_tracker,
        })
    }

    pub fn token_tracker(&self) -> Arc<SpotifyTokenTracker> {
        self.token_tracker.clone()
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let token = self.token_tracker.get_token().await?;

        let url = self.endpoint(segments);
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(segments.join("/")));
        }
        if status == StatusCode::UNAUTHORIZED {
            warn!("Spotify rejected the access token for {}", segments.join("/"));
            self.token_tracker.invalidate().await;
            return Err(CatalogError::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.into_message())
                .unwrap_or(body);
            warn!("Spotify returned {} for {}: {}", status, segments.join("/"), message);
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CatalogService for SpotifyCatalog {
    fn name(&self) -> &str {
        "spotify"
    }

    async fn track(&self, id: &str) -> Result<CatalogTrack, CatalogError> {
        self.get_json(&["tracks", id], &[]).await
    }

    async fn artist(&self, id: &str) -> Result<CatalogArtist, CatalogError> {
        self.get_json(&["artists", id], &[]).await
    }

    async fn artist_top_tracks(&self, id: &str) -> Result<Vec<CatalogTrack>, CatalogError> {
        let resp: TopTracksResponse = self
            .get_json(
                &["artists", id, "top-tracks"],
                &[("market", self.market.clone())],
            )
            .await?;
        Ok(resp.tracks)
    }

    async fn artist_albums(&self, id: &str) -> Result<Vec<CatalogAlbum>, CatalogError> {
        let page: Paging<CatalogAlbum> = self.get_json(&["artists", id, "albums"], &[]).await?;
        Ok(page.items)
    }

    async fn search_tracks(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        let resp: SearchResponse = self
            .get_json(
                &["search"],
                &[
                    ("q", query.to_string()),
                    ("type", "track".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(resp.tracks.map(|p| p.items).unwrap_or_default())
    }
}
