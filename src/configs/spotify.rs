use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(default = "default_market")]
    pub market: String,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Seconds before token expiry at which the background task refreshes it.
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

fn default_market() -> String {
    "US".to_string()
}

fn default_search_limit() -> usize {
    5
}

fn default_refresh_margin_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_token_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            market: default_market(),
            search_limit: default_search_limit(),
            refresh_margin_secs: default_refresh_margin_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            api_base: default_api_base(),
            token_url: default_token_url(),
        }
    }
}
