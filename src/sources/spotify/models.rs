use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Image {
    pub url: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AlbumRef {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
}

impl CatalogTrack {
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }

    /// Largest album cover (the catalog lists images widest first).
    pub fn artwork_url(&self) -> Option<&str> {
        self.album
            .as_ref()
            .and_then(|a| a.images.first())
            .map(|i| i.url.as_str())
    }

    /// `"{title} {primary artist}"`, the string used to find matching audio.
    pub fn search_query(&self) -> String {
        match self.primary_artist() {
            Some(artist) => format!("{} {}", self.name, artist),
            None => self.name.clone(),
        }
    }
}

/// Full artist object; fields not modelled here are kept verbatim.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CatalogArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CatalogAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
    pub album_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Paging<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub tracks: Option<Paging<CatalogTrack>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopTracksResponse {
    pub tracks: Vec<CatalogTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorBody {
    Api { message: String },
    // The accounts service answers `{"error": "invalid_client", ...}`.
    Code(String),
}

impl ErrorBody {
    pub fn into_message(self) -> String {
        match self {
            Self::Api { message } => message,
            Self::Code(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn track_projection_reads_catalog_json() {
        let track: CatalogTrack = serde_json::from_value(json!({
            "id": "4cOdK2wGLETKBW3PvgPWqT",
            "name": "Never Gonna Give You Up",
            "duration_ms": 213573,
            "artists": [{"id": "0gxyHStUsqpMadRV0Di1Qt", "name": "Rick Astley"}],
            "album": {
                "id": "6XhjNHCyCDyyGJRM5mg40G",
                "name": "Whenever You Need Somebody",
                "images": [
                    {"url": "https://i.scdn.co/image/640", "height": 640, "width": 640},
                    {"url": "https://i.scdn.co/image/300", "height": 300, "width": 300}
                ]
            },
            "popularity": 80
        }))
        .expect("valid track");

        assert_eq!(track.primary_artist(), Some("Rick Astley"));
        assert_eq!(track.artwork_url(), Some("https://i.scdn.co/image/640"));
        assert_eq!(track.search_query(), "Never Gonna Give You Up Rick Astley");
    }

    #[test]
    fn artist_keeps_unknown_fields() {
        let raw = json!({
            "id": "0gxyHStUsqpMadRV0Di1Qt",
            "name": "Rick Astley",
            "images": [],
            "genres": ["dance rock"],
            "followers": {"href": null, "total": 4000000}
        });
        let artist: CatalogArtist = serde_json::from_value(raw.clone()).expect("valid artist");
        assert_eq!(serde_json::to_value(&artist).expect("serializable"), raw);
    }

    #[test]
    fn error_body_accepts_both_shapes() {
        let api: ErrorEnvelope =
            serde_json::from_value(json!({"error": {"status": 400, "message": "invalid id"}}))
                .expect("api error");
        assert_eq!(api.error.into_message(), "invalid id");

        let accounts: ErrorEnvelope =
            serde_json::from_value(json!({"error": "invalid_client"})).expect("accounts error");
        assert_eq!(accounts.error.into_message(), "invalid_client");
    }
}
