//! Types for file intake.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::error::IntakeError;

/// A file handed over by the picker or drop zone, not yet validated.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    /// MIME type as declared by the picker, if any.
    pub media_type: Option<String>,
    pub content: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, media_type: Option<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            content,
        }
    }

    /// Reads a candidate from disk, inferring its media type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, IntakeError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await.map_err(|source| IntakeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            media_type: media_type_for_path(path).map(str::to_string),
            name,
            content,
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.content.len() as u64
    }

    /// The declared type, or one inferred from the file name.
    pub(crate) fn declared_type(&self) -> Option<String> {
        self.media_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_ascii_lowercase)
            .or_else(|| media_type_for_path(Path::new(&self.name)).map(str::to_string))
    }
}

/// Maps the drop zone's accepted extensions to MIME types.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// A validated input file. Cloning shares the content buffer.
#[derive(Debug, Clone)]
pub struct SourceFile {
    id: Uuid,
    name: String,
    media_type: String,
    content: Arc<[u8]>,
    selected_at: DateTime<Utc>,
}

impl SourceFile {
    pub(crate) fn new(name: String, media_type: String, content: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            media_type,
            content: content.into(),
            selected_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn size_bytes(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn selected_at(&self) -> DateTime<Utc> {
        self.selected_at
    }

    /// File name up to the first dot.
    pub fn stem(&self) -> Option<&str> {
        self.name.split('.').next().filter(|s| !s.is_empty())
    }

    /// Name offered for the MIDI download, e.g. `score.png` -> `score.mid`.
    pub fn suggested_download_name(&self) -> String {
        format!("{}.mid", self.stem().unwrap_or("converted"))
    }
}

/// A locally renderable representation of the current source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "uri", rename_all = "snake_case")]
pub enum PreviewArtifact {
    /// Inline `data:` URI of the selected file.
    DataUri(String),
    /// Annotated render returned by the conversion service.
    Rendered(String),
}

impl PreviewArtifact {
    pub fn uri(&self) -> &str {
        match self {
            Self::DataUri(uri) | Self::Rendered(uri) => uri,
        }
    }
}
