use std::sync::Arc;

use axum::{Router, middleware, routing::get};

use crate::{
    server::AppState,
    transport::{
        middleware::{add_response_headers, cors_layer},
        routes,
    },
};

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);

    Router::new()
        .route("/", get(routes::get_banner))
        .route("/info", get(routes::get_info))
        .route("/stream", get(routes::stream_track))
        .route("/search/{query}", get(routes::search_songs))
        .route("/search/artist/{id}", get(routes::get_artist))
        .route("/artist-albums/{id}", get(routes::artist_top_tracks))
        .route("/artist/{id}/albums", get(routes::artist_albums))
        .layer(middleware::from_fn(add_response_headers))
        .layer(cors)
        .with_state(state)
}
