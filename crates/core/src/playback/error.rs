//! Error types for playback.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// No media is attached.
    #[error("No media attached")]
    NotAttached,

    /// The media failed to load or decode.
    #[error("Media resource error: {reason}")]
    Resource { reason: String },
}

impl PlaybackError {
    pub fn resource(reason: impl Into<String>) -> Self {
        Self::Resource {
            reason: reason.into(),
        }
    }
}
