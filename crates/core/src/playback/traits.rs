//! Trait definitions for the media playback primitive.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::PlaybackError;
use super::types::MediaEvent;

/// Opens media resources (an audio element, an output stream, ...).
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Returns the name of this backend implementation.
    fn name(&self) -> &str;

    /// Binds `url` and returns a handle to control it.
    ///
    /// The backend reports metadata, position updates, end of media and
    /// errors through `events`. Sends may fail once the controller detaches;
    /// backends should treat that as a signal to stop reporting.
    async fn open(
        &self,
        url: &str,
        events: mpsc::Sender<MediaEvent>,
    ) -> Result<Box<dyn MediaHandle>, PlaybackError>;
}

/// Control surface of one opened media resource.
pub trait MediaHandle: Send {
    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    fn seek(&mut self, position_secs: f64);

    /// Output gain in `0.0..=1.0`.
    fn set_gain(&mut self, gain: f32);

    /// Stops playback and frees the resource. Called exactly once, on detach.
    fn release(&mut self);
}
