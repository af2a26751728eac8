//! Workflow runner that owns the intake, conversion and playback lifecycles.

use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{FileSummary, Stage, WorkflowError, WorkflowEvent, WorkflowSnapshot};
use crate::config::{Config, ConversionConfig};
use crate::conversion::{ConversionResult, ConversionService, ConversionSession, SessionEvent};
use crate::download::{self, Downloader};
use crate::intake::{derive_preview, FileCandidate, FileIntake, PreviewArtifact, SourceFile};
use crate::playback::{MediaBackend, PlaybackController};

/// Capacity of the observer broadcast channel.
pub const EVENT_BUFFER: usize = 256;

/// The in-flight conversion and the task forwarding its events.
struct ActiveSession {
    id: Uuid,
    forwarder: JoinHandle<()>,
}

impl ActiveSession {
    /// Stops forwarding. Dropping the session inside the forwarder aborts the service call.
    fn abort(self) {
        self.forwarder.abort();
    }
}

#[derive(Default)]
struct State {
    stage: Stage,
    file: Option<SourceFile>,
    preview: Option<PreviewArtifact>,
    session: Option<ActiveSession>,
    /// Identifier of the last started session, kept after it settles.
    last_session_id: Option<Uuid>,
    progress: u8,
    result: Option<ConversionResult>,
}

/// Drives one file at a time through intake, conversion and playback.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct Workflow {
    intake: FileIntake,
    conversion: ConversionConfig,
    service: Arc<dyn ConversionService>,
    playback: Option<Arc<PlaybackController>>,
    downloader: Option<Arc<dyn Downloader>>,
    state: Arc<RwLock<State>>,
    events: broadcast::Sender<WorkflowEvent>,
}

impl Workflow {
    pub fn new(config: &Config, service: Arc<dyn ConversionService>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            intake: FileIntake::new(config.intake.clone()),
            conversion: config.conversion.clone(),
            service,
            playback: None,
            downloader: None,
            state: Arc::new(RwLock::new(State::default())),
            events,
        }
    }

    /// Enables playback of successful results through `backend`.
    pub fn with_playback(mut self, backend: Arc<dyn MediaBackend>) -> Self {
        self.playback = Some(Arc::new(PlaybackController::new(backend)));
        self
    }

    /// Enables [`Workflow::download`].
    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = Some(downloader);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub fn playback(&self) -> Option<&PlaybackController> {
        self.playback.as_deref()
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    pub async fn stage(&self) -> Stage {
        self.state.read().await.stage
    }

    pub async fn progress(&self) -> u8 {
        self.state.read().await.progress
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.state.read().await;

        let output = state
            .result
            .as_ref()
            .and_then(|r| r.output())
            .cloned();
        let preview = match output.as_ref().and_then(|o| o.rendered_preview_url.clone()) {
            Some(url) => Some(PreviewArtifact::Rendered(url)),
            None => state.preview.clone(),
        };
        let failure_message = state
            .result
            .as_ref()
            .and_then(|r| r.failure_ref())
            .map(|f| f.user_message().to_string());
        let playback = match &self.playback {
            Some(controller) => controller.snapshot().await,
            None => None,
        };

        WorkflowSnapshot {
            stage: state.stage,
            file: state.file.as_ref().map(FileSummary::from),
            preview,
            session_id: state.last_session_id,
            progress: state.progress,
            can_convert: state.stage == Stage::Previewing && state.session.is_none(),
            can_download: state.stage == Stage::Ready && output.is_some(),
            output,
            failure_message,
            playback,
        }
    }

    /// Validates a candidate and makes it the current file.
    ///
    /// A rejected file leaves the workflow untouched. An accepted one cancels any
    /// in-flight conversion, tears down playback and discards the previous result
    /// before the new preview is derived. The state lock is held until the preview
    /// is ready, so overlapping selections apply in call order.
    pub async fn select_file(&self, candidate: FileCandidate) -> Result<(), WorkflowError> {
        let file = match self.intake.submit(candidate) {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, "File rejected");
                self.emit(WorkflowEvent::FileRejected {
                    reason: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let mut state = self.state.write().await;
        self.clear_downstream(&mut state).await;
        state.file = None;
        state.preview = None;
        state.last_session_id = None;

        let preview = match derive_preview(&file).await {
            Ok(preview) => preview,
            Err(e) => {
                warn!(file = %file.name(), error = %e, "Preview derivation failed");
                self.transition(&mut state, Stage::Idle);
                return Err(e.into());
            }
        };

        info!(
            file = %file.name(),
            media_type = %file.media_type(),
            size_bytes = file.size_bytes(),
            "File selected"
        );
        let file_name = file.name().to_string();
        state.file = Some(file);
        state.preview = Some(preview);
        self.transition(&mut state, Stage::Previewing);
        self.emit(WorkflowEvent::PreviewReady { file_name });
        Ok(())
    }

    /// Starts converting the current file and returns the new session id.
    ///
    /// Rejected while another session is in flight; the running one is unaffected.
    pub async fn convert(&self) -> Result<Uuid, WorkflowError> {
        let mut state = self.state.write().await;

        if let Some(active) = &state.session {
            warn!(session_id = %active.id, "Conversion already in progress, ignoring request");
            return Err(WorkflowError::ConcurrentConversion);
        }
        if state.stage != Stage::Previewing {
            return Err(WorkflowError::InvalidStage {
                expected: "previewing",
                actual: state.stage,
            });
        }
        let file = state.file.clone().ok_or(WorkflowError::InvalidStage {
            expected: "previewing",
            actual: state.stage,
        })?;

        let session = ConversionSession::start(Arc::clone(&self.service), file, &self.conversion);
        let id = session.id();
        let forwarder = tokio::spawn(self.clone().forward(session));

        state.session = Some(ActiveSession { id, forwarder });
        state.last_session_id = Some(id);
        state.progress = 0;
        state.result = None;
        self.transition(&mut state, Stage::Converting);
        Ok(id)
    }

    /// Cancels the in-flight conversion. Returns whether one was running.
    pub async fn cancel(&self) -> bool {
        let mut state = self.state.write().await;
        let Some(active) = state.session.take() else {
            return false;
        };
        info!(session_id = %active.id, "Conversion cancelled");
        active.abort();
        state.progress = 0;
        self.transition(&mut state, Stage::Previewing);
        true
    }

    /// Discards a settled result and returns to `Previewing` with the same file.
    pub async fn rearm(&self) -> Result<(), WorkflowError> {
        let mut state = self.state.write().await;
        if !state.stage.is_settled() {
            return Err(WorkflowError::InvalidStage {
                expected: "ready or failed",
                actual: state.stage,
            });
        }
        self.clear_downstream(&mut state).await;
        state.last_session_id = None;
        self.transition(&mut state, Stage::Previewing);
        Ok(())
    }

    /// Drops the file and everything derived from it.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        self.clear_downstream(&mut state).await;
        state.file = None;
        state.preview = None;
        state.last_session_id = None;
        self.transition(&mut state, Stage::Idle);
    }

    /// Hands the download artifact to the configured downloader.
    ///
    /// Only acts in `Ready`. Returns whether a download was triggered.
    pub async fn download(&self) -> bool {
        let (url, suggested) = {
            let state = self.state.read().await;
            if state.stage != Stage::Ready {
                debug!(stage = %state.stage, "Download ignored outside ready stage");
                return false;
            }
            let url = state
                .result
                .as_ref()
                .and_then(|r| r.output())
                .map(|o| o.download_url.clone());
            let suggested = state
                .file
                .as_ref()
                .map(|f| f.suggested_download_name())
                .unwrap_or_else(|| "converted.mid".to_string());
            (url, suggested)
        };

        let Some(downloader) = &self.downloader else {
            warn!("No downloader configured");
            return false;
        };
        download::trigger_download(downloader.as_ref(), url.as_deref(), &suggested).await
    }

    async fn forward(self, mut session: ConversionSession) {
        let id = session.id();
        while let Some(event) = session.next_event().await {
            match event {
                SessionEvent::Progress(percent) => self.apply_progress(id, percent).await,
                SessionEvent::Settled(result) => {
                    self.settle(id, result).await;
                    break;
                }
            }
        }
    }

    async fn apply_progress(&self, session_id: Uuid, percent: u8) {
        let mut state = self.state.write().await;
        if !Self::is_current(&state, session_id) {
            debug!(%session_id, percent, "Dropping progress from stale session");
            return;
        }
        if percent <= state.progress {
            return;
        }
        state.progress = percent;
        self.emit(WorkflowEvent::Progress {
            session_id,
            percent,
        });
    }

    async fn settle(&self, session_id: Uuid, result: ConversionResult) {
        let mut state = self.state.write().await;
        if !Self::is_current(&state, session_id) {
            debug!(%session_id, "Dropping result from stale session");
            return;
        }
        // Detach rather than abort: this may be running on the forwarder itself.
        state.session = None;

        let success = result.is_success();
        if let Some(output) = result.output() {
            info!(
                %session_id,
                primary_media_url = %output.primary_media_url,
                download_url = %output.download_url,
                "Conversion succeeded"
            );
            if state.progress < 100 {
                state.progress = 100;
                self.emit(WorkflowEvent::Progress {
                    session_id,
                    percent: 100,
                });
            }
            if let Some(playback) = &self.playback {
                if let Err(e) = playback.attach(&output.primary_media_url).await {
                    warn!(%session_id, error = %e, "Playback unavailable for converted media");
                }
            }
        } else if let Some(failure) = result.failure_ref() {
            warn!(%session_id, error = %failure.error(), "Conversion failed");
        }
        state.result = Some(result);
        self.transition(&mut state, if success { Stage::Ready } else { Stage::Failed });

        self.emit(WorkflowEvent::Settled {
            session_id,
            success,
        });
    }

    /// Aborts any in-flight session, detaches playback and clears the result.
    async fn clear_downstream(&self, state: &mut State) {
        if let Some(active) = state.session.take() {
            info!(session_id = %active.id, "Superseding in-flight conversion");
            active.abort();
        }
        if let Some(playback) = &self.playback {
            playback.detach().await;
        }
        state.result = None;
        state.progress = 0;
    }

    fn is_current(state: &State, session_id: Uuid) -> bool {
        state
            .session
            .as_ref()
            .is_some_and(|active| active.id == session_id)
    }

    fn transition(&self, state: &mut State, to: Stage) {
        let from = state.stage;
        if from == to {
            return;
        }
        info!(%from, %to, "Workflow stage changed");
        state.stage = to;
        self.emit(WorkflowEvent::StageChanged { from, to });
    }

    fn emit(&self, event: WorkflowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
