//! Playback state types.

use serde::{Deserialize, Serialize};

/// Volume a fresh controller starts with.
pub const DEFAULT_VOLUME: u8 = 80;

/// Events reported by a media backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaEvent {
    MetadataLoaded { duration_secs: f64 },
    TimeUpdate { position_secs: f64 },
    Ended,
    Error { reason: String },
}

/// Live state of the attached media.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSession {
    pub url: String,
    pub playing: bool,
    pub position_secs: f64,
    /// `None` until metadata has loaded.
    pub duration_secs: Option<f64>,
    /// Stored volume in `0..=100`, kept while muted.
    pub volume: u8,
    pub muted: bool,
    /// Inline load/decode error, if any.
    pub error: Option<String>,
}

impl PlaybackSession {
    /// Duration for display, 0 while unknown.
    pub fn duration_or_zero(&self) -> f64 {
        self.duration_secs.unwrap_or(0.0)
    }

    /// Volume actually applied to the output.
    pub fn effective_volume(&self) -> u8 {
        if self.muted {
            0
        } else {
            self.volume
        }
    }
}

/// Formats seconds as `m:ss`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
