use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::configs::*;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl Config {
    /// Reads `config.toml`, then `config.default.toml`, then falls back to
    /// built-in defaults. Environment overrides are applied last.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match ["config.toml", "config.default.toml"]
            .into_iter()
            .find(|p| Path::new(p).exists())
        {
            Some(path) => {
                crate::log_println!("Loading configuration from: {}", path);
                Self::from_file(path)?
            }
            None => {
                crate::log_println!("No config file found, using defaults and environment");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Applies the deployment variables `SPOTIFY_CLIENT_ID`,
    /// `SPOTIFY_CLIENT_SECRET`, `PORT` and `ALLOWED_URL`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("SPOTIFY_CLIENT_ID").filter(|v| !v.is_empty()) {
            self.spotify.client_id = Some(id);
        }
        if let Some(secret) = lookup("SPOTIFY_CLIENT_SECRET").filter(|v| !v.is_empty()) {
            self.spotify.client_secret = Some(secret);
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => crate::log_println!("Ignoring invalid PORT value '{}'", port),
            }
        }
        if let Some(origin) = lookup("ALLOWED_URL").filter(|v| !v.is_empty()) {
            self.server.allowed_origin = Some(origin);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        if missing(&self.spotify.client_id) || missing(&self.spotify.client_secret) {
            return Err(ConfigError::Invalid(
                "spotify client_id and client_secret are required".into(),
            ));
        }
        if self.cache.eviction == EvictionKind::Lru && self.cache.max_size_mb == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_size_mb must be positive with lru eviction".into(),
            ));
        }
        Ok(())
    }
}
