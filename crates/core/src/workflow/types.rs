//! Types for the workflow state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::conversion::ConversionOutput;
use crate::intake::{IntakeError, PreviewArtifact, SourceFile};
use crate::playback::PlaybackSession;

/// Workflow stage shown to the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    Previewing,
    Converting,
    Ready,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Previewing => "previewing",
            Self::Converting => "converting",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    /// Whether the stage is a resolved conversion.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by workflow operations. None of them is fatal.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The selected file was rejected at intake.
    #[error("invalid file: {0}")]
    InvalidFile(#[from] IntakeError),

    /// A conversion is already in flight.
    #[error("a conversion is already in progress")]
    ConcurrentConversion,

    /// The operation is not allowed in the current stage.
    #[error("invalid workflow stage: expected {expected}, got {actual}")]
    InvalidStage {
        expected: &'static str,
        actual: Stage,
    },
}

/// Notifications for observers of the workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StageChanged { from: Stage, to: Stage },
    FileRejected { reason: String },
    PreviewReady { file_name: String },
    Progress { session_id: Uuid, percent: u8 },
    Settled { session_id: Uuid, success: bool },
}

/// Display data for the selected file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub media_type: String,
    pub size_bytes: u64,
    /// File name offered for the MIDI download.
    pub download_name: String,
}

impl From<&SourceFile> for FileSummary {
    fn from(file: &SourceFile) -> Self {
        Self {
            name: file.name().to_string(),
            media_type: file.media_type().to_string(),
            size_bytes: file.size_bytes(),
            download_name: file.suggested_download_name(),
        }
    }
}

/// Point-in-time view of the workflow for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    pub stage: Stage,
    pub file: Option<FileSummary>,
    /// Rendered preview from the service when available, otherwise the local one.
    pub preview: Option<PreviewArtifact>,
    pub session_id: Option<Uuid>,
    pub progress: u8,
    pub output: Option<ConversionOutput>,
    /// User-facing failure text; raw causes are only logged.
    pub failure_message: Option<String>,
    pub playback: Option<PlaybackSession>,
    pub can_convert: bool,
    pub can_download: bool,
}
