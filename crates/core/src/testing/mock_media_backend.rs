//! Mock media backend for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use crate::playback::{MediaBackend, MediaEvent, MediaHandle, PlaybackError};

/// What the controller has done to one opened handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockHandleState {
    pub url: String,
    pub play_calls: usize,
    pub pause_calls: usize,
    pub position_secs: f64,
    pub gain: f32,
    pub playing: bool,
    pub released: bool,
}

#[derive(Debug, Default)]
struct BackendState {
    handles: Vec<Arc<Mutex<MockHandleState>>>,
    senders: Vec<mpsc::Sender<MediaEvent>>,
    fail_next: Option<String>,
}

/// Mock implementation of the MediaBackend trait.
///
/// Records every opened handle and keeps the event sender of each one, so
/// tests can play the part of the audio element with [`MockMediaBackend::emit`].
/// Handle calls are synchronous, so state sits behind a std mutex.
#[derive(Debug, Clone, Default)]
pub struct MockMediaBackend {
    state: Arc<Mutex<BackendState>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockMediaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `open` fail with a resource error.
    pub fn fail_next_open(&self, reason: &str) {
        lock(&self.state).fail_next = Some(reason.to_string());
    }

    pub fn open_count(&self) -> usize {
        lock(&self.state).handles.len()
    }

    /// State of the handle opened `index`-th.
    pub fn handle(&self, index: usize) -> Option<MockHandleState> {
        lock(&self.state)
            .handles
            .get(index)
            .map(|h| lock(h).clone())
    }

    pub fn last_handle(&self) -> Option<MockHandleState> {
        lock(&self.state).handles.last().map(|h| lock(h).clone())
    }

    pub fn last_sender(&self) -> Option<mpsc::Sender<MediaEvent>> {
        lock(&self.state).senders.last().cloned()
    }

    /// Deliver an event for the most recently opened media.
    ///
    /// Returns false when nothing is listening anymore.
    pub async fn emit(&self, event: MediaEvent) -> bool {
        let Some(sender) = self.last_sender() else {
            return false;
        };
        sender.send(event).await.is_ok()
    }
}

#[async_trait]
impl MediaBackend for MockMediaBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(
        &self,
        url: &str,
        events: mpsc::Sender<MediaEvent>,
    ) -> Result<Box<dyn MediaHandle>, PlaybackError> {
        let mut state = lock(&self.state);
        if let Some(reason) = state.fail_next.take() {
            return Err(PlaybackError::resource(reason));
        }

        let handle = Arc::new(Mutex::new(MockHandleState {
            url: url.to_string(),
            gain: 1.0,
            ..Default::default()
        }));
        state.handles.push(Arc::clone(&handle));
        state.senders.push(events);
        Ok(Box::new(MockMediaHandle { state: handle }))
    }
}

struct MockMediaHandle {
    state: Arc<Mutex<MockHandleState>>,
}

impl MediaHandle for MockMediaHandle {
    fn play(&mut self) -> Result<(), PlaybackError> {
        let mut state = lock(&self.state);
        state.play_calls += 1;
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = lock(&self.state);
        state.pause_calls += 1;
        state.playing = false;
    }

    fn seek(&mut self, position_secs: f64) {
        lock(&self.state).position_secs = position_secs;
    }

    fn set_gain(&mut self, gain: f32) {
        lock(&self.state).gain = gain;
    }

    fn release(&mut self) {
        let mut state = lock(&self.state);
        state.playing = false;
        state.released = true;
    }
}
