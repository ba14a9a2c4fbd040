use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use super::models::{ErrorEnvelope, TokenResponse};
use crate::{
    common::{Backoff, CatalogError, SharedRw, now_ms},
    configs::SpotifyConfig,
};

/// A cached token is handed out only while it has at least this much life left.
const VALIDITY_MARGIN_MS: u64 = 5_000;
const RETRY_BASE: Duration = Duration::from_secs(1);
const RETRY_MAX: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct SpotifyToken {
    pub access_token: String,
    pub expiry_ms: u64,
}

impl SpotifyToken {
    fn is_valid_at(&self, now_ms: u64) -> bool {
        self.expiry_ms > now_ms + VALIDITY_MARGIN_MS
    }
}

/// Client-credentials token shared by every catalog request.
pub struct SpotifyTokenTracker {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_margin: Duration,
    pub(super) token: SharedRw<Option<SpotifyToken>>,
    refresh_lock: Mutex<()>,
}

impl SpotifyTokenTracker {
    pub fn new(client: reqwest::Client, config: &SpotifyConfig) -> Self {
        Self {
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone().unwrap_or_default(),
            client_secret: config.client_secret.clone().unwrap_or_default(),
            refresh_margin: Duration::from_secs(config.refresh_margin_secs),
            token: Arc::new(RwLock::new(None)),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Returns a valid token, fetching one first if the cached token expired.
    /// A failed fetch is returned as is, so callers see the upstream reason.
    pub async fn get_token(&self) -> Result<String, CatalogError> {
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        match self.refresh_token().await {
            Ok(token) => Ok(token.access_token),
            Err(e) => {
                error!("Failed to retrieve a Spotify access token: {}", e);
                Err(e)
            }
        }
    }

    async fn cached(&self) -> Option<String> {
        let lock = self.token.read().await;
        lock.as_ref()
            .filter(|t| t.is_valid_at(now_ms()))
            .map(|t| t.access_token.clone())
    }

    /// Drops the cached token so the next request fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }

    pub async fn refresh_token(&self) -> Result<SpotifyToken, CatalogError> {
        debug!("Requesting Spotify client-credentials token");
        let resp = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.into_message())
                .unwrap_or(body);
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;

        let token = SpotifyToken {
            access_token: body.access_token,
            expiry_ms: now_ms() + body.expires_in * 1000,
        };
        *self.token.write().await = Some(token.clone());

        info!("Access token retrieved, expires in {}s", body.expires_in);
        Ok(token)
    }

    /// Delay until `token` should be replaced.
    fn refresh_delay(&self, token: &SpotifyToken) -> Duration {
        let remaining = Duration::from_millis(token.expiry_ms.saturating_sub(now_ms()));
        remaining
            .saturating_sub(self.refresh_margin)
            .max(Duration::from_secs(1))
    }

    /// Keeps the token fresh in the background: refreshes shortly before
    /// expiry and retries failures with exponential backoff.
    pub fn spawn_refresh_loop(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut backoff = Backoff::new(RETRY_BASE, RETRY_MAX);
            loop {
                let delay = match self.refresh_token().await {
                    Ok(token) => {
                        backoff.reset();
                        self.refresh_delay(&token)
                    }
                    Err(e) => {
                        let delay = backoff.next();
                        warn!(
                            "Token refresh attempt {} failed: {}; retrying in {:?}",
                            backoff.attempt(),
                            e,
                            delay
                        );
                        delay
                    }
                };
                tokio::time::sleep(delay).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::json;

    use super::*;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{}", addr)
    }

    fn config(token_url: String) -> SpotifyConfig {
        SpotifyConfig {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            token_url,
            ..SpotifyConfig::default()
        }
    }

    #[tokio::test]
    async fn caches_token_until_expiry() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/api/token",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({
                        "access_token": "tok-1",
                        "token_type": "Bearer",
                        "expires_in": 3600
                    }))
                }
            }),
        );
        let base = serve(router).await;
        let tracker = SpotifyTokenTracker::new(
            reqwest::Client::new(),
            &config(format!("{}/api/token", base)),
        );

        assert_eq!(tracker.get_token().await.expect("token"), "tok-1");
        assert_eq!(tracker.get_token().await.expect("token"), "tok-1");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        tracker.invalidate().await;
        assert_eq!(tracker.get_token().await.expect("token"), "tok-1");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn rejected_credentials_surface_upstream_message() {
        let router = Router::new().route(
            "/api/token",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_client", "error_description": "Invalid client"})),
                )
            }),
        );
        let base = serve(router).await;
        let tracker = SpotifyTokenTracker::new(
            reqwest::Client::new(),
            &config(format!("{}/api/token", base)),
        );

        match tracker.refresh_token().await {
            Err(CatalogError::Upstream { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid_client");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        match tracker.get_token().await {
            Err(CatalogError::Upstream { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid_client");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn refresh_fires_before_expiry() {
        let tracker = SpotifyTokenTracker::new(
            reqwest::Client::new(),
            &config("http://127.0.0.1:9/api/token".into()),
        );
        let token = SpotifyToken {
            access_token: "t".into(),
            expiry_ms: now_ms() + 3_600_000,
        };
        let delay = tracker.refresh_delay(&token);
        assert!(delay <= Duration::from_secs(3540));
        assert!(delay > Duration::from_secs(3500));

        let expired = SpotifyToken {
            access_token: "t".into(),
            expiry_ms: 0,
        };
        assert_eq!(tracker.refresh_delay(&expired), Duration::from_secs(1));
    }
}
