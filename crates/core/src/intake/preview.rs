//! Data URI preview derivation.

use base64::{engine::general_purpose, Engine as _};

use super::error::IntakeError;
use super::types::{PreviewArtifact, SourceFile};

/// Encodes bytes as a `data:<media_type>;base64,...` URI.
pub fn encode_data_uri(media_type: &str, content: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        media_type,
        general_purpose::STANDARD.encode(content)
    )
}

/// Derives the preview for a file on the blocking pool.
pub async fn derive_preview(file: &SourceFile) -> Result<PreviewArtifact, IntakeError> {
    let file = file.clone();
    tokio::task::spawn_blocking(move || {
        PreviewArtifact::DataUri(encode_data_uri(file.media_type(), file.content()))
    })
    .await
    .map_err(|e| IntakeError::PreviewFailed(e.to_string()))
}
