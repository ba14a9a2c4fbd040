use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Failures reported by the music catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog rejected the access token")]
    Unauthorized,

    #[error("catalog resource not found: {0}")]
    NotFound(String),

    #[error("catalog returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected catalog payload: {0}")]
    Decode(String),
}

/// Failures reported by the external audio search/download tool.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {code}: {stderr}")]
    Exit {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("unexpected output: {0}")]
    Output(String),
}

/// Errors raised while turning a catalog id into audio bytes.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Error looking up track: {0}")]
    CatalogLookup(#[from] CatalogError),

    #[error("No playable source found for '{query}'")]
    NoMatch { query: String },

    #[error("Error searching for '{query}': {source}")]
    Resolution {
        query: String,
        #[source]
        source: ResolverError,
    },

    #[error("Error downloading track: {0}")]
    Download(String),

    #[error("Cache storage failure: {0}")]
    Storage(#[from] std::io::Error),
}

impl FetchError {
    /// Stable machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CatalogLookup(_) => "catalog_lookup",
            Self::NoMatch { .. } | Self::Resolution { .. } => "resolution",
            Self::Download(_) => "download",
            Self::Storage(_) => "storage",
        }
    }
}

/// JSON error body returned by every route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// HTTP status code.
    pub status: u16,
    /// HTTP status reason phrase (e.g. "Bad Request").
    pub error: String,
    /// Failure class, when the error came out of the pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    /// Human-readable error message.
    pub message: String,
    /// The request path that caused the error.
    pub path: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            timestamp: super::now_ms(),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").into(),
            kind: None,
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, path)
    }

    pub fn internal(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, path)
    }

    pub fn with_kind(mut self, kind: &'static str) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn from_fetch(err: &FetchError, path: impl Into<String>) -> Self {
        Self::internal(err.to_string(), path).with_kind(err.kind())
    }

    pub fn from_catalog(err: &CatalogError, path: impl Into<String>) -> Self {
        Self::internal(err.to_string(), path).with_kind("catalog_lookup")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
