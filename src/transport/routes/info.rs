use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    cache::CacheUsage,
    common::{ApiError, AudioFormat},
    server::AppState,
};

#[derive(Debug, Serialize)]
pub struct Banner {
    pub name: &'static str,
    pub version: &'static str,
}

impl Banner {
    fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    pub root: String,
    pub eviction: &'static str,
    #[serde(flatten)]
    pub usage: CacheUsage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    #[serde(flatten)]
    pub banner: Banner,
    pub audio_format: AudioFormat,
    pub cache: CacheInfo,
}

/// GET /
pub async fn get_banner() -> Json<Banner> {
    tracing::debug!("GET /");
    Json(Banner::current())
}

/// GET /info
pub async fn get_info(State(state): State<Arc<AppState>>) -> Response {
    tracing::debug!("GET /info");
    let cache = state.fetcher.cache();
    let usage = match cache.usage().await {
        Ok(usage) => usage,
        Err(e) => {
            tracing::error!("GET /info: failed to scan cache: {}", e);
            return ApiError::internal(format!("Failed to scan cache: {}", e), "/info")
                .with_kind("storage")
                .into_response();
        }
    };

    Json(Info {
        banner: Banner::current(),
        audio_format: state.fetcher.format(),
        cache: CacheInfo {
            root: cache.root().display().to_string(),
            eviction: cache.policy_name(),
            usage,
        },
    })
    .into_response()
}
