use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::{error, info};

use crate::{
    common::{ApiError, CatalogError},
    server::AppState,
};

fn catalog_failure(context: &str, err: &CatalogError, path: String) -> Response {
    error!("GET {}: {}", path, err);
    let mut body = ApiError::from_catalog(err, path);
    body.message = format!("{}: {}", context, err);
    body.into_response()
}

/// GET /search/{query}
pub async fn search_songs(
    Path(query): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("GET /search/{}", query);
    match state.catalog.search(&query).await {
        Ok(songs) => Json(songs).into_response(),
        Err(e) => catalog_failure("Error searching songs", &e, format!("/search/{}", query)),
    }
}

/// GET /search/artist/{id}
pub async fn get_artist(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    info!("GET /search/artist/{}", id);
    match state.catalog.artist(&id).await {
        Ok(artist) => Json(artist).into_response(),
        Err(e) => catalog_failure("Error fetching artist", &e, format!("/search/artist/{}", id)),
    }
}

/// GET /artist-albums/{id}
///
/// Historically answers with the artist's top tracks; see `artist_albums`
/// for the album listing.
pub async fn artist_top_tracks(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("GET /artist-albums/{}", id);
    match state.catalog.top_tracks(&id).await {
        Ok(tracks) => Json(tracks).into_response(),
        Err(e) => catalog_failure(
            "Error fetching top tracks",
            &e,
            format!("/artist-albums/{}", id),
        ),
    }
}

/// GET /artist/{id}/albums
pub async fn artist_albums(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("GET /artist/{}/albums", id);
    match state.catalog.albums(&id).await {
        Ok(albums) => Json(albums).into_response(),
        Err(e) => catalog_failure(
            "Error fetching artist albums",
            &e,
            format!("/artist/{}/albums", id),
        ),
    }
}
