//! Download capability exposed to the presentation layer.
//!
//! The workflow only decides when a download is invocable (Ready with a
//! download URL). How the artifact is saved is up to the [`Downloader`]
//! supplied by the embedding application.

use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::DownloadConfig;

/// Side-effecting "save this URL" action.
///
/// Implementations report their own failures (logging, UI toast); callers
/// never see an error.
#[async_trait]
pub trait Downloader: Send + Sync {
    fn name(&self) -> &str;

    async fn trigger_download(&self, url: &str, suggested_filename: &str);
}

/// Runs `downloader` if `url` is present. Returns whether it was invoked.
pub async fn trigger_download(
    downloader: &dyn Downloader,
    url: Option<&str>,
    suggested_filename: &str,
) -> bool {
    match url.filter(|u| !u.is_empty()) {
        Some(url) => {
            downloader.trigger_download(url, suggested_filename).await;
            true
        }
        None => false,
    }
}

/// Strips any directory components from a suggested name.
fn safe_file_name(suggested_filename: &str) -> String {
    Path::new(suggested_filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "converted.mid".to_string())
}

/// Fetches the artifact over HTTP and writes it into a directory.
pub struct HttpDownloader {
    client: Client,
    output_dir: PathBuf,
}

impl HttpDownloader {
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            client: Client::new(),
            output_dir: config.output_dir.clone(),
        }
    }

    pub fn target_path(&self, suggested_filename: &str) -> PathBuf {
        self.output_dir.join(safe_file_name(suggested_filename))
    }

    async fn fetch(&self, url: &str, target: &Path) -> anyhow::Result<u64> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(target, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    fn name(&self) -> &str {
        "http"
    }

    async fn trigger_download(&self, url: &str, suggested_filename: &str) {
        let target = self.target_path(suggested_filename);
        match self.fetch(url, &target).await {
            Ok(size_bytes) => info!(url = %url, path = ?target, size_bytes, "Saved download"),
            Err(e) => error!(url = %url, path = ?target, "Download failed: {:#}", e),
        }
    }
}
