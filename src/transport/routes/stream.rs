use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::{
    common::ApiError,
    range::{RangeError, RangeSpec, unsatisfied_content_range},
    server::AppState,
};

const STREAM_PATH: &str = "/stream";

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Catalog track id.
    pub url: Option<String>,
}

/// GET /stream?url={catalogId}
///
/// Answers only ranged requests. The `Range` header is validated before any
/// catalog or download work is started.
pub async fn stream_track(
    Query(params): Query<StreamQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!(
        "GET /stream url={:?} Range={:?}",
        params.url,
        headers.get(header::RANGE)
    );

    let Some(range_value) = headers.get(header::RANGE) else {
        return ApiError::bad_request("Requires Range header", STREAM_PATH).into_response();
    };
    let spec = match range_value
        .to_str()
        .map_err(|_| RangeError::Malformed("non-ASCII value".into()))
        .and_then(str::parse::<RangeSpec>)
    {
        Ok(spec) => spec,
        Err(e) => return ApiError::bad_request(e.to_string(), STREAM_PATH).into_response(),
    };
    let Some(catalog_id) = params.url.filter(|id| !id.trim().is_empty()) else {
        return ApiError::bad_request("Missing url query parameter", STREAM_PATH)
            .into_response();
    };

    let blob = match state.fetcher.fetch(&catalog_id).await {
        Ok(blob) => blob,
        Err(e) => {
            error!("GET /stream url={}: {}", catalog_id, e);
            return ApiError::from_fetch(&e, STREAM_PATH).into_response();
        }
    };

    let total = blob.len() as u64;
    let range = match spec.resolve(total) {
        Ok(range) => range,
        Err(e) => {
            debug!("GET /stream url={}: {}", catalog_id, e);
            let mut response =
                ApiError::new(StatusCode::RANGE_NOT_SATISFIABLE, e.to_string(), STREAM_PATH)
                    .into_response();
            if let Ok(v) = HeaderValue::from_str(&unsatisfied_content_range(total)) {
                response.headers_mut().insert(header::CONTENT_RANGE, v);
            }
            return response;
        }
    };

    debug!(
        "GET /stream url={}: serving {}",
        catalog_id,
        range.content_range(total)
    );
    (
        StatusCode::PARTIAL_CONTENT,
        [
            (
                header::CONTENT_TYPE,
                state.fetcher.format().content_type().to_string(),
            ),
            (header::CONTENT_RANGE, range.content_range(total)),
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CONTENT_LENGTH, range.len().to_string()),
        ],
        range.slice(&blob),
    )
        .into_response()
}
