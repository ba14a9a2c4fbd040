use serde::{Deserialize, Serialize};

use crate::common::AudioFormat;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ResolverConfig {
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default)]
    pub audio_format: AudioFormat,
    /// Upper bound for a single search or download. `0` waits forever.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra arguments appended to every invocation (cookies, proxies, ...).
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_binary() -> String {
    "yt-dlp".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            audio_format: AudioFormat::default(),
            timeout_secs: default_timeout_secs(),
            extra_args: Vec::new(),
        }
    }
}
