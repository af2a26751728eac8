//! Mock downloader for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::download::Downloader;

/// A recorded download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDownload {
    pub url: String,
    pub suggested_filename: String,
}

/// Mock implementation of the Downloader trait that only records requests.
#[derive(Debug, Clone, Default)]
pub struct MockDownloader {
    downloads: Arc<RwLock<Vec<RecordedDownload>>>,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded_downloads(&self) -> Vec<RecordedDownload> {
        self.downloads.read().await.clone()
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn trigger_download(&self, url: &str, suggested_filename: &str) {
        self.downloads.write().await.push(RecordedDownload {
            url: url.to_string(),
            suggested_filename: suggested_filename.to_string(),
        });
    }
}
