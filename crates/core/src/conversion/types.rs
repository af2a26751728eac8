//! Types for the conversion module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::error::{ConversionError, ServiceError};
use crate::intake::SourceFile;

/// Reply of the external conversion service.
///
/// `success` is authoritative: a reply without it is a failure even when URLs
/// are present and no transport error occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub success: bool,
    /// Playable result (audio rendering of the recognized score).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_media_url: Option<String>,
    /// Exportable artifact (MIDI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Optional re-rendered preview of the input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image_url: Option<String>,
    /// Diagnostic message from the service, never shown raw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceResponse {
    /// A successful reply with playable and downloadable URLs.
    pub fn success(primary_media_url: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            success: true,
            primary_media_url: Some(primary_media_url.into()),
            download_url: Some(download_url.into()),
            ..Default::default()
        }
    }

    /// A reply that does not report success.
    pub fn failure() -> Self {
        Self::default()
    }

    pub fn with_preview_image(mut self, url: impl Into<String>) -> Self {
        self.preview_image_url = Some(url.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// The outbound unit of work for one session.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub id: Uuid,
    pub file: SourceFile,
    pub started_at: DateTime<Utc>,
}

impl ConversionRequest {
    pub fn new(file: SourceFile) -> Self {
        Self {
            id: Uuid::new_v4(),
            file,
            started_at: Utc::now(),
        }
    }
}

/// URLs produced by a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub primary_media_url: String,
    pub download_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_preview_url: Option<String>,
}

/// A failed conversion. The error is shared so results stay cheap to clone.
#[derive(Debug, Clone)]
pub struct ConversionFailure {
    error: Arc<ConversionError>,
}

impl ConversionFailure {
    pub fn new(error: ConversionError) -> Self {
        Self {
            error: Arc::new(error),
        }
    }

    pub fn error(&self) -> &ConversionError {
        &self.error
    }

    /// Text safe to show to the user.
    pub fn user_message(&self) -> &'static str {
        self.error.user_message()
    }
}

/// Outcome of a conversion request. Immutable once produced.
#[derive(Debug, Clone)]
pub enum ConversionResult {
    Success(ConversionOutput),
    Failure(ConversionFailure),
}

impl ConversionResult {
    /// Normalizes a service reply.
    ///
    /// A single-URL reply is treated as the degenerate case where the
    /// playable and downloadable URLs are the same.
    pub fn from_response(response: ServiceResponse) -> Self {
        if !response.success {
            return Self::failure(ConversionError::rejected(response.message));
        }

        let primary = response
            .primary_media_url
            .clone()
            .or_else(|| response.download_url.clone());
        let download = response.download_url.or(response.primary_media_url);

        match (primary, download) {
            (Some(primary_media_url), Some(download_url)) => Self::Success(ConversionOutput {
                primary_media_url,
                download_url,
                rendered_preview_url: response.preview_image_url,
            }),
            _ => Self::failure(ConversionError::rejected(Some(
                "service reported success without a media URL".to_string(),
            ))),
        }
    }

    pub fn from_transport(error: ServiceError) -> Self {
        Self::failure(ConversionError::from(error))
    }

    pub fn cancelled() -> Self {
        Self::failure(ConversionError::Cancelled)
    }

    pub fn failure(error: ConversionError) -> Self {
        Self::Failure(ConversionFailure::new(error))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn output(&self) -> Option<&ConversionOutput> {
        match self {
            Self::Success(output) => Some(output),
            Self::Failure(_) => None,
        }
    }

    pub fn failure_ref(&self) -> Option<&ConversionFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}
