//! Error types for the conversion module.

use thiserror::Error;

/// Message shown to the user for any failed conversion. Raw causes stay in logs.
const FAILURE_MESSAGE: &str = "An error occurred while processing the sheet music.";

/// Faults talking to the conversion service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Could not connect to the service.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The request did not complete in time.
    #[error("Request timed out")]
    Timeout,

    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request could not be built or sent.
    #[error("Request failed: {0}")]
    Request(String),
}

/// Why a conversion session ended without a playable result.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The service replied but did not report success.
    #[error("Conversion rejected by service: {}", .message.as_deref().unwrap_or("no success flag"))]
    Rejected { message: Option<String> },

    /// The service call itself failed.
    #[error("Conversion transport error: {source}")]
    Transport {
        #[source]
        source: ServiceError,
    },

    /// The session was cancelled before it settled.
    #[error("Conversion cancelled")]
    Cancelled,
}

impl ConversionError {
    pub fn rejected(message: Option<String>) -> Self {
        Self::Rejected { message }
    }

    /// Text safe to show to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Rejected { .. } | Self::Transport { .. } => FAILURE_MESSAGE,
            Self::Cancelled => "Conversion cancelled.",
        }
    }

    /// Whether retrying the same file may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                source: ServiceError::Timeout | ServiceError::ConnectionFailed(_),
            }
        )
    }
}

impl From<ServiceError> for ConversionError {
    fn from(source: ServiceError) -> Self {
        Self::Transport { source }
    }
}
