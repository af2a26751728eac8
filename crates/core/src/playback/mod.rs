//! Playback control for the converted audio.
//!
//! [`PlaybackController`] binds one media URL at a time through a
//! [`MediaBackend`] and keeps the live [`PlaybackSession`] state: playing
//! flag, position, duration, volume and mute. Media events are pumped from
//! the backend on a task that is torn down on [`detach`](PlaybackController::detach),
//! so nothing from a previous attachment can reach the current session.

mod controller;
mod error;
mod traits;
mod types;

pub use controller::{PlaybackController, MEDIA_EVENT_BUFFER};
pub use error::PlaybackError;
pub use traits::{MediaBackend, MediaHandle};
pub use types::{format_time, MediaEvent, PlaybackSession, DEFAULT_VOLUME};
