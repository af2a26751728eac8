//! Error types for file intake.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a candidate file is rejected at intake.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The candidate has no content.
    #[error("File is empty: {name}")]
    Empty { name: String },

    /// The candidate exceeds the configured size ceiling.
    #[error("File too large: {name} is {size_bytes} bytes (max {max_bytes})")]
    TooLarge {
        name: String,
        size_bytes: u64,
        max_bytes: u64,
    },

    /// The candidate's media type is outside the accepted envelope.
    #[error("Unsupported file type for {name}: {media_type}")]
    UnsupportedType { name: String, media_type: String },

    /// The candidate could not be read from disk.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Preview encoding did not complete.
    #[error("Failed to build preview: {0}")]
    PreviewFailed(String),
}

impl IntakeError {
    /// Whether the user should be prompted to pick another file.
    pub fn is_invalid_file(&self) -> bool {
        matches!(
            self,
            Self::Empty { .. } | Self::TooLarge { .. } | Self::UnsupportedType { .. }
        )
    }
}
