use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{
    common::{AudioFormat, ResolverError, SourceId, SourceMatch},
    configs::ResolverConfig,
    sources::AudioResolver,
};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

#[derive(Debug, Deserialize)]
struct SearchPlaylist {
    #[serde(default)]
    entries: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: Option<String>,
}

/// Drives the `yt-dlp` executable for both search and download.
pub struct YtDlpResolver {
    binary: String,
    extra_args: Vec<String>,
    timeout: Option<Duration>,
}

impl YtDlpResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            extra_args: config.extra_args.clone(),
            timeout: (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs)),
        }
    }

    fn search_args(&self, query: &str) -> Vec<String> {
        let mut args = vec![
            format!("ytsearch1:{}", query),
            "--dump-single-json".to_string(),
            "--flat-playlist".to_string(),
            "--no-check-certificates".to_string(),
            "--no-warnings".to_string(),
            "--prefer-free-formats".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    fn download_args(&self, source: &SourceId, dest_dir: &Path, format: AudioFormat) -> Vec<String> {
        let template = dest_dir.join(format!("{}.%(ext)s", source));
        let mut args = vec![
            format!("{}{}", WATCH_URL, source),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            format.as_ytdlp_arg().to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    async fn run(&self, args: Vec<String>) -> Result<Vec<u8>, ResolverError> {
        debug!("Running {} {:?}", self.binary, args);
        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ResolverError::Spawn {
                program: self.binary.clone(),
                source,
            })?;

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ResolverError::Timeout {
                    program: self.binary.clone(),
                    secs: limit.as_secs(),
                })?,
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| ResolverError::Spawn {
            program: self.binary.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ResolverError::Exit {
                program: self.binary.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr: summarize_stderr(&output.stderr),
            });
        }
        Ok(output.stdout)
    }
}

/// First result id from `--dump-single-json` output of a `ytsearch1:` query.
fn parse_search_output(stdout: &[u8]) -> Result<Option<SourceId>, ResolverError> {
    let playlist: SearchPlaylist = serde_json::from_slice(stdout)
        .map_err(|e| ResolverError::Output(format!("invalid search JSON: {}", e)))?;
    Ok(playlist
        .entries
        .into_iter()
        .find_map(|e| e.id.filter(|id| !id.is_empty()))
        .map(SourceId::from))
}

/// Keeps the `ERROR:` lines yt-dlp prints, or the last line otherwise.
fn summarize_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let errors: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR:"))
        .collect();
    if !errors.is_empty() {
        return errors.join("; ");
    }
    text.lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .unwrap_or("no output")
        .to_string()
}

#[async_trait]
impl AudioResolver for YtDlpResolver {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn search(&self, query: &str) -> Result<Option<SourceId>, ResolverError> {
        let stdout = self.run(self.search_args(query)).await?;
        let found = parse_search_output(&stdout)?;
        debug!("Search '{}' -> {:?}", query, found);
        Ok(found)
    }

    async fn download(
        &self,
        source: &SourceMatch,
        dest_dir: &Path,
        format: AudioFormat,
    ) -> Result<PathBuf, ResolverError> {
        info!(
            "Downloading {} ('{}') as {}",
            source.source_id,
            source.query,
            format.as_ext()
        );
        self.run(self.download_args(&source.source_id, dest_dir, format))
            .await?;

        let produced = dest_dir.join(format!("{}.{}", source.source_id, format.as_ext()));
        match tokio::fs::try_exists(&produced).await {
            Ok(true) => Ok(produced),
            _ => Err(ResolverError::Output(format!(
                "expected {} after download",
                produced.display()
            ))),
        }
    }
}
