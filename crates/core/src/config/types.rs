use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Accepted input envelope for file intake.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntakeConfig {
    /// MIME patterns; `image/*` style wildcards are allowed.
    #[serde(default = "default_accepted_types")]
    pub accepted_types: Vec<String>,
    /// Size ceiling in bytes (inclusive).
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            accepted_types: default_accepted_types(),
            max_size_bytes: default_max_size_bytes(),
        }
    }
}

fn default_accepted_types() -> Vec<String> {
    [
        "image/png",
        "image/jpeg",
        "image/gif",
        "image/bmp",
        "image/webp",
        "application/pdf",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_size_bytes() -> u64 {
    10 * 1024 * 1024 // 10 MB
}

/// Conversion service endpoint and progress ticker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionConfig {
    /// Base URL of the recognition service; relative result paths are joined onto it.
    #[serde(default = "default_service_url")]
    pub service_url: String,
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_tick_step")]
    pub tick_step: u8,
    /// Highest simulated value before the real result arrives.
    #[serde(default = "default_progress_cap")]
    pub progress_cap: u8,
}

impl ConversionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn upload_url(&self) -> String {
        format!(
            "{}/{}",
            self.service_url.trim_end_matches('/'),
            self.upload_path.trim_start_matches('/')
        )
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            upload_path: default_upload_path(),
            timeout_secs: default_timeout(),
            tick_interval_ms: default_tick_interval(),
            tick_step: default_tick_step(),
            progress_cap: default_progress_cap(),
        }
    }
}

fn default_service_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_upload_path() -> String {
    "/upload/".to_string()
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

fn default_tick_interval() -> u64 {
    200
}

fn default_tick_step() -> u8 {
    5
}

fn default_progress_cap() -> u8 {
    95
}

/// Where downloaded artifacts are written by headless downloaders.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
