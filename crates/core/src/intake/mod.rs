//! File intake: validation of the single user-selected file and preview derivation.
//!
//! Intake accepts one candidate at a time, checks it against the configured
//! [`IntakeConfig`](crate::config::IntakeConfig) envelope (non-empty, size
//! ceiling, MIME patterns) and produces a [`SourceFile`]. The local
//! [`PreviewArtifact`] is a data URI computed off the async executor.

mod error;
mod preview;
mod types;

pub use error::IntakeError;
pub use preview::{derive_preview, encode_data_uri};
pub use types::{media_type_for_path, FileCandidate, PreviewArtifact, SourceFile};

use tracing::debug;

use crate::config::IntakeConfig;

/// Validates candidates against the accepted input envelope.
#[derive(Debug, Clone)]
pub struct FileIntake {
    config: IntakeConfig,
}

impl FileIntake {
    pub fn new(config: IntakeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Validates a candidate and turns it into a [`SourceFile`].
    ///
    /// Checks run in order: emptiness, size ceiling, media type.
    pub fn submit(&self, candidate: FileCandidate) -> Result<SourceFile, IntakeError> {
        let size_bytes = candidate.size_bytes();
        if size_bytes == 0 {
            return Err(IntakeError::Empty {
                name: candidate.name,
            });
        }
        if size_bytes > self.config.max_size_bytes {
            return Err(IntakeError::TooLarge {
                name: candidate.name,
                size_bytes,
                max_bytes: self.config.max_size_bytes,
            });
        }

        let media_type = match candidate.declared_type() {
            Some(media_type) if self.accepts(&media_type) => media_type,
            other => {
                return Err(IntakeError::UnsupportedType {
                    name: candidate.name,
                    media_type: other.unwrap_or_else(|| "unknown".to_string()),
                })
            }
        };

        debug!(
            name = %candidate.name,
            media_type = %media_type,
            size_bytes,
            "Accepted source file"
        );
        Ok(SourceFile::new(candidate.name, media_type, candidate.content))
    }

    /// Whether a media type matches one of the accepted patterns.
    pub fn accepts(&self, media_type: &str) -> bool {
        let media_type = media_type.trim().to_ascii_lowercase();
        self.config
            .accepted_types
            .iter()
            .any(|pattern| mime_matches(pattern, &media_type))
    }
}

fn mime_matches(pattern: &str, media_type: &str) -> bool {
    let pattern = pattern.trim().to_ascii_lowercase();
    match pattern.strip_suffix("/*") {
        Some(top_level) => media_type
            .split_once('/')
            .is_some_and(|(kind, _)| kind == top_level),
        None => pattern == media_type,
    }
}
