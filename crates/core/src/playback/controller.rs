//! Playback controller implementation.

use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::PlaybackError;
use super::traits::{MediaBackend, MediaHandle};
use super::types::{MediaEvent, PlaybackSession, DEFAULT_VOLUME};

/// Capacity of the media event channel handed to the backend.
pub const MEDIA_EVENT_BUFFER: usize = 64;

/// Volume and mute settings. They survive across attachments.
#[derive(Debug, Clone, Copy)]
struct VolumeState {
    level: u8,
    muted: bool,
    /// Last non-zero level, restored on unmute.
    restore_level: u8,
}

impl VolumeState {
    fn new(level: u8) -> Self {
        let level = level.min(100);
        Self {
            level,
            muted: level == 0,
            restore_level: if level == 0 { DEFAULT_VOLUME } else { level },
        }
    }

    fn set(&mut self, level: u8) {
        self.level = level.min(100);
        self.muted = self.level == 0;
        if self.level > 0 {
            self.restore_level = self.level;
        }
    }

    fn toggle_mute(&mut self) {
        if self.muted {
            self.muted = false;
            if self.level == 0 {
                self.level = self.restore_level;
            }
        } else {
            self.muted = true;
        }
    }

    fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            f32::from(self.level) / 100.0
        }
    }
}

/// One bound media resource and its live state.
struct Attached {
    url: String,
    handle: Option<Box<dyn MediaHandle>>,
    playing: bool,
    position_secs: f64,
    duration_secs: Option<f64>,
    error: Option<String>,
    pump: Option<JoinHandle<()>>,
}

impl Attached {
    fn at_end(&self) -> bool {
        self.duration_secs
            .is_some_and(|duration| self.position_secs >= duration)
    }

    fn clamp_position(&self, position_secs: f64) -> f64 {
        if position_secs.is_nan() {
            return 0.0;
        }
        match self.duration_secs {
            Some(duration) => position_secs.clamp(0.0, duration),
            None if position_secs.is_finite() => position_secs.max(0.0),
            None => 0.0,
        }
    }

    fn handle_mut(&mut self) -> Result<&mut Box<dyn MediaHandle>, PlaybackError> {
        match self.handle.as_mut() {
            Some(handle) => Ok(handle),
            None => Err(PlaybackError::resource(
                self.error.clone().unwrap_or_else(|| "media not loaded".to_string()),
            )),
        }
    }

    fn apply(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::MetadataLoaded { duration_secs } => {
                if duration_secs.is_finite() && duration_secs >= 0.0 {
                    self.duration_secs = Some(duration_secs);
                    self.position_secs = self.clamp_position(self.position_secs);
                }
            }
            MediaEvent::TimeUpdate { position_secs } => {
                self.position_secs = self.clamp_position(position_secs);
                if self.playing && self.at_end() {
                    debug!(url = %self.url, "Reached end of media");
                    self.playing = false;
                }
            }
            MediaEvent::Ended => {
                if let Some(duration) = self.duration_secs {
                    self.position_secs = duration;
                }
                self.playing = false;
            }
            MediaEvent::Error { reason } => {
                warn!(url = %self.url, reason = %reason, "Media resource error");
                self.error = Some(reason);
                self.playing = false;
            }
        }
    }
}

impl Drop for Attached {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if let Some(mut handle) = self.handle.take() {
            handle.release();
        }
    }
}

struct Inner {
    /// Bumped on every attach/detach; pumps from older generations are ignored.
    generation: u64,
    volume: VolumeState,
    media: Option<Attached>,
}

/// Controls the single media resource bound to the current result.
pub struct PlaybackController {
    backend: Arc<dyn MediaBackend>,
    inner: Arc<Mutex<Inner>>,
}

impl PlaybackController {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self::with_volume(backend, DEFAULT_VOLUME)
    }

    pub fn with_volume(backend: Arc<dyn MediaBackend>, volume: u8) -> Self {
        Self {
            backend,
            inner: Arc::new(Mutex::new(Inner {
                generation: 0,
                volume: VolumeState::new(volume),
                media: None,
            })),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Binds `url`, replacing any previous media. Position starts at 0 and the
    /// duration stays unknown until the backend reports metadata.
    ///
    /// A load failure is kept inline on the session and also returned.
    pub async fn attach(&self, url: &str) -> Result<(), PlaybackError> {
        let mut inner = self.inner.lock().await;
        inner.media = None;
        inner.generation += 1;
        let generation = inner.generation;

        let (events_tx, events_rx) = mpsc::channel(MEDIA_EVENT_BUFFER);
        let mut attached = Attached {
            url: url.to_string(),
            handle: None,
            playing: false,
            position_secs: 0.0,
            duration_secs: None,
            error: None,
            pump: None,
        };

        let result = match self.backend.open(url, events_tx).await {
            Ok(mut handle) => {
                handle.set_gain(inner.volume.gain());
                attached.handle = Some(handle);
                attached.pump = Some(tokio::spawn(pump_events(
                    Arc::downgrade(&self.inner),
                    generation,
                    events_rx,
                )));
                info!(url = %url, backend = self.backend.name(), "Attached media");
                Ok(())
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to open media");
                attached.error = Some(e.to_string());
                Err(e)
            }
        };

        inner.media = Some(attached);
        result
    }

    /// Releases the media resource and stops event propagation.
    ///
    /// Returns whether anything was attached.
    pub async fn detach(&self) -> bool {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        match inner.media.take() {
            Some(media) => {
                info!(url = %media.url, "Detached media");
                true
            }
            None => false,
        }
    }

    pub async fn is_attached(&self) -> bool {
        self.inner.lock().await.media.is_some()
    }

    /// Starts playback. No-op while already playing; rewinds first when at the end.
    pub async fn play(&self) -> Result<(), PlaybackError> {
        let mut inner = self.inner.lock().await;
        let media = inner.media.as_mut().ok_or(PlaybackError::NotAttached)?;
        if media.playing {
            return Ok(());
        }
        if media.at_end() {
            media.position_secs = 0.0;
            media.handle_mut()?.seek(0.0);
        }

        let played = media.handle_mut()?.play();
        match played {
            Ok(()) => {
                media.playing = true;
                Ok(())
            }
            Err(e) => {
                media.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Pauses playback. No-op while already paused.
    pub async fn pause(&self) -> Result<(), PlaybackError> {
        let mut inner = self.inner.lock().await;
        let media = inner.media.as_mut().ok_or(PlaybackError::NotAttached)?;
        if !media.playing {
            return Ok(());
        }
        if let Some(handle) = media.handle.as_mut() {
            handle.pause();
        }
        media.playing = false;
        Ok(())
    }

    pub async fn toggle_play(&self) -> Result<(), PlaybackError> {
        let playing = self
            .snapshot()
            .await
            .ok_or(PlaybackError::NotAttached)?
            .playing;
        if playing {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Moves to `position_secs`, clamped to `[0, duration]`.
    ///
    /// The reported position updates immediately, before the backend's seek completes.
    pub async fn seek(&self, position_secs: f64) -> Result<f64, PlaybackError> {
        let mut inner = self.inner.lock().await;
        let media = inner.media.as_mut().ok_or(PlaybackError::NotAttached)?;
        let target = media.clamp_position(position_secs);
        media.position_secs = target;
        if let Some(handle) = media.handle.as_mut() {
            handle.seek(target);
        }
        Ok(target)
    }

    /// Sets the volume in `0..=100`. Zero mutes; any positive level unmutes.
    pub async fn set_volume(&self, level: u8) {
        let mut inner = self.inner.lock().await;
        inner.volume.set(level);
        let gain = inner.volume.gain();
        if let Some(handle) = inner.media.as_mut().and_then(|m| m.handle.as_mut()) {
            handle.set_gain(gain);
        }
    }

    /// Mutes while keeping the stored volume, or restores it.
    pub async fn toggle_mute(&self) {
        let mut inner = self.inner.lock().await;
        inner.volume.toggle_mute();
        let gain = inner.volume.gain();
        if let Some(handle) = inner.media.as_mut().and_then(|m| m.handle.as_mut()) {
            handle.set_gain(gain);
        }
    }

    /// `(volume, muted)`, available with or without media.
    pub async fn volume(&self) -> (u8, bool) {
        let inner = self.inner.lock().await;
        (inner.volume.level, inner.volume.muted)
    }

    pub async fn snapshot(&self) -> Option<PlaybackSession> {
        let inner = self.inner.lock().await;
        inner.media.as_ref().map(|media| PlaybackSession {
            url: media.url.clone(),
            playing: media.playing,
            position_secs: media.position_secs,
            duration_secs: media.duration_secs,
            volume: inner.volume.level,
            muted: inner.volume.muted,
            error: media.error.clone(),
        })
    }
}

async fn pump_events(
    weak: Weak<Mutex<Inner>>,
    generation: u64,
    mut events: mpsc::Receiver<MediaEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(shared) = weak.upgrade() else {
            break;
        };
        let mut inner = shared.lock().await;
        if inner.generation != generation {
            debug!(generation, "Dropping event from stale media");
            break;
        }
        match inner.media.as_mut() {
            Some(media) => media.apply(event),
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockMediaBackend;

    async fn attached(duration: f64) -> (PlaybackController, MockMediaBackend) {
        let backend = MockMediaBackend::new();
        let controller = PlaybackController::new(Arc::new(backend.clone()));
        controller.attach("a.mp3").await.unwrap();
        backend
            .emit(MediaEvent::MetadataLoaded {
                duration_secs: duration,
            })
            .await;
        settle().await;
        (controller, backend)
    }

    /// Lets the pump task drain pending events.
    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_attach_resets_position_and_waits_for_metadata() {
        let backend = MockMediaBackend::new();
        let controller = PlaybackController::new(Arc::new(backend.clone()));
        controller.attach("a.mp3").await.unwrap();

        let session = controller.snapshot().await.unwrap();
        assert_eq!(session.url, "a.mp3");
        assert_eq!(session.position_secs, 0.0);
        assert_eq!(session.duration_secs, None);
        assert_eq!(session.duration_or_zero(), 0.0);
        assert!(!session.playing);

        backend
            .emit(MediaEvent::MetadataLoaded { duration_secs: 42.0 })
            .await;
        settle().await;
        assert_eq!(controller.snapshot().await.unwrap().duration_secs, Some(42.0));
    }

    #[tokio::test]
    async fn test_play_pause_idempotent() {
        let (controller, backend) = attached(60.0).await;

        controller.play().await.unwrap();
        controller.play().await.unwrap();
        assert!(controller.snapshot().await.unwrap().playing);
        assert_eq!(backend.last_handle().unwrap().play_calls, 1);

        controller.pause().await.unwrap();
        controller.pause().await.unwrap();
        assert!(!controller.snapshot().await.unwrap().playing);
        assert_eq!(backend.last_handle().unwrap().pause_calls, 1);
    }

    #[tokio::test]
    async fn test_seek_is_optimistic_and_clamped() {
        let (controller, backend) = attached(120.0).await;

        for t in [0.0, 12.5, 60.0, 120.0] {
            assert_eq!(controller.seek(t).await.unwrap(), t);
            assert_eq!(controller.snapshot().await.unwrap().position_secs, t);
        }
        assert_eq!(controller.seek(500.0).await.unwrap(), 120.0);
        assert_eq!(controller.seek(-3.0).await.unwrap(), 0.0);
        assert_eq!(controller.seek(f64::NAN).await.unwrap(), 0.0);
        assert_eq!(backend.last_handle().unwrap().position_secs, 0.0);
    }

    #[tokio::test]
    async fn test_volume_zero_mutes_and_toggle_restores() {
        let (controller, backend) = attached(30.0).await;

        controller.set_volume(65).await;
        assert_eq!(controller.volume().await, (65, false));
        assert_eq!(backend.last_handle().unwrap().gain, 0.65);

        controller.toggle_mute().await;
        assert_eq!(controller.volume().await, (65, true));
        assert_eq!(backend.last_handle().unwrap().gain, 0.0);

        controller.toggle_mute().await;
        assert_eq!(controller.volume().await, (65, false));
        assert_eq!(backend.last_handle().unwrap().gain, 0.65);

        controller.set_volume(0).await;
        assert_eq!(controller.volume().await, (0, true));

        // Unmuting from a zero level goes back to the last audible one.
        controller.toggle_mute().await;
        assert_eq!(controller.volume().await, (65, false));

        controller.set_volume(30).await;
        controller.toggle_mute().await;
        controller.set_volume(40).await;
        assert_eq!(controller.volume().await, (40, false));
    }

    #[tokio::test]
    async fn test_double_toggle_from_zero_volume_stays_audible() {
        let (controller, backend) = attached(30.0).await;
        controller.set_volume(0).await;
        assert_eq!(controller.volume().await, (0, true));

        // The first toggle brings back the default level, the second mutes it.
        controller.toggle_mute().await;
        assert_eq!(controller.volume().await, (80, false));
        assert_eq!(backend.last_handle().unwrap().gain, 0.8);

        controller.toggle_mute().await;
        assert_eq!(controller.volume().await, (80, true));
        assert_eq!(backend.last_handle().unwrap().gain, 0.0);
    }

    #[tokio::test]
    async fn test_natural_end_stops_playing() {
        let (controller, backend) = attached(10.0).await;
        controller.play().await.unwrap();

        backend
            .emit(MediaEvent::TimeUpdate { position_secs: 9.5 })
            .await;
        settle().await;
        assert!(controller.snapshot().await.unwrap().playing);

        backend
            .emit(MediaEvent::TimeUpdate { position_secs: 10.0 })
            .await;
        settle().await;
        let session = controller.snapshot().await.unwrap();
        assert!(!session.playing);
        assert_eq!(session.position_secs, 10.0);

        // Playing again starts over rather than staying at the end.
        controller.play().await.unwrap();
        let session = controller.snapshot().await.unwrap();
        assert!(session.playing);
        assert_eq!(session.position_secs, 0.0);
    }

    #[tokio::test]
    async fn test_ended_event_stops_playing() {
        let (controller, backend) = attached(10.0).await;
        controller.play().await.unwrap();
        backend.emit(MediaEvent::Ended).await;
        settle().await;

        let session = controller.snapshot().await.unwrap();
        assert!(!session.playing);
        assert_eq!(session.position_secs, 10.0);
    }

    #[tokio::test]
    async fn test_detach_releases_and_stops_events() {
        let (controller, backend) = attached(10.0).await;
        controller.play().await.unwrap();

        assert!(controller.detach().await);
        settle().await;

        let handle = backend.last_handle().unwrap();
        assert!(handle.released);
        assert!(controller.snapshot().await.is_none());
        assert!(!controller.is_attached().await);

        // The backend can no longer reach the controller.
        assert!(
            !backend
                .emit(MediaEvent::TimeUpdate { position_secs: 3.0 })
                .await
        );
        assert!(matches!(controller.play().await, Err(PlaybackError::NotAttached)));
        assert!(!controller.detach().await);
    }

    #[tokio::test]
    async fn test_reattach_ignores_old_media_events() {
        let (controller, backend) = attached(10.0).await;
        let old_events = backend.last_sender().unwrap();

        controller.attach("b.mp3").await.unwrap();
        assert!(backend.handle(0).unwrap().released);

        let _ = old_events
            .send(MediaEvent::MetadataLoaded { duration_secs: 999.0 })
            .await;
        settle().await;

        let session = controller.snapshot().await.unwrap();
        assert_eq!(session.url, "b.mp3");
        assert_eq!(session.duration_secs, None);
        assert_eq!(backend.open_count(), 2);
    }

    #[tokio::test]
    async fn test_load_failure_is_inline() {
        let backend = MockMediaBackend::new();
        backend.fail_next_open("unsupported codec");
        let controller = PlaybackController::new(Arc::new(backend.clone()));

        let err = controller.attach("bad.mp3").await.unwrap_err();
        assert!(matches!(err, PlaybackError::Resource { .. }));

        let session = controller.snapshot().await.unwrap();
        assert!(session.error.unwrap().contains("unsupported codec"));
        assert!(matches!(
            controller.play().await,
            Err(PlaybackError::Resource { .. })
        ));
    }

    #[tokio::test]
    async fn test_decode_error_event() {
        let (controller, backend) = attached(10.0).await;
        controller.play().await.unwrap();
        backend
            .emit(MediaEvent::Error {
                reason: "decode failed".to_string(),
            })
            .await;
        settle().await;

        let session = controller.snapshot().await.unwrap();
        assert!(!session.playing);
        assert_eq!(session.error.as_deref(), Some("decode failed"));
    }

    #[tokio::test]
    async fn test_dropping_controller_releases_media() {
        let (controller, backend) = attached(10.0).await;
        drop(controller);
        settle().await;
        assert!(backend.last_handle().unwrap().released);
    }

    #[tokio::test]
    async fn test_not_attached() {
        let controller = PlaybackController::new(Arc::new(MockMediaBackend::new()));
        assert!(matches!(controller.seek(1.0).await, Err(PlaybackError::NotAttached)));
        assert!(matches!(controller.toggle_play().await, Err(PlaybackError::NotAttached)));
        controller.set_volume(20).await;
        assert_eq!(controller.volume().await, (20, false));
    }
}
