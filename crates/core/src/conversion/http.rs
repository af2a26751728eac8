//! HTTP client for the recognition service's multipart upload endpoint.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::error::ServiceError;
use super::traits::ConversionService;
use super::types::ServiceResponse;
use crate::config::ConversionConfig;
use crate::intake::SourceFile;

/// Upload endpoint reply. Paths are relative to the service origin.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    midi_file: Option<String>,
    mp3_file: Option<String>,
    preview_image: Option<String>,
    error: Option<String>,
}

impl UploadResponse {
    fn into_service_response(self, base_url: &str) -> ServiceResponse {
        let success = self.error.is_none() && (self.mp3_file.is_some() || self.midi_file.is_some());
        ServiceResponse {
            success,
            primary_media_url: self.mp3_file.map(|p| resolve_url(base_url, &p)),
            download_url: self.midi_file.map(|p| resolve_url(base_url, &p)),
            preview_image_url: self.preview_image.map(|p| resolve_url(base_url, &p)),
            message: self.error,
        }
    }
}

/// Joins a service-relative path onto the base URL. Absolute URLs pass through.
fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn map_request_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout
    } else if e.is_connect() {
        ServiceError::ConnectionFailed(e.to_string())
    } else if e.is_decode() {
        ServiceError::InvalidResponse(e.to_string())
    } else {
        ServiceError::Request(e.to_string())
    }
}

/// Conversion service reached over HTTP.
pub struct HttpConversionService {
    client: Client,
    config: ConversionConfig,
}

impl HttpConversionService {
    pub fn new(config: ConversionConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }
}

#[async_trait]
impl ConversionService for HttpConversionService {
    fn name(&self) -> &str {
        "http"
    }

    async fn convert(&self, file: &SourceFile) -> Result<ServiceResponse, ServiceError> {
        let url = self.config.upload_url();
        let part = Part::bytes(file.content().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.media_type())
            .map_err(|e| ServiceError::Request(e.to_string()))?;
        let form = Form::new().part("file", part);

        debug!(url = %url, file = %file.name(), size_bytes = file.size_bytes(), "Uploading score");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        Ok(upload.into_service_response(&self.config.service_url))
    }
}
