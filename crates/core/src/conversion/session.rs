//! Conversion session driver.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ticker::ProgressTicker;
use super::traits::ConversionService;
use super::types::{ConversionRequest, ConversionResult};
use crate::config::ConversionConfig;
use crate::intake::SourceFile;

/// Capacity of the per-session progress channel.
pub const PROGRESS_BUFFER: usize = 32;

/// Something observable happened in a session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Progress estimate in `0..=100`, non-decreasing within a session.
    Progress(u8),
    /// The session resolved. Always the last event.
    Settled(ConversionResult),
}

/// A running conversion attempt.
///
/// The service call and the progress ticker run together on a spawned driver
/// task. Dropping the session, or calling [`cancel`](Self::cancel), aborts the
/// driver: the ticker stops and the pending service reply is discarded.
pub struct ConversionSession {
    request: ConversionRequest,
    progress_rx: mpsc::Receiver<u8>,
    outcome_rx: oneshot::Receiver<ConversionResult>,
    last_progress: u8,
    settled: bool,
    driver: JoinHandle<()>,
}

impl ConversionSession {
    /// Submits `file` to `service` and starts the progress ticker.
    pub fn start(
        service: Arc<dyn ConversionService>,
        file: SourceFile,
        config: &ConversionConfig,
    ) -> Self {
        let request = ConversionRequest::new(file);
        let ticker = ProgressTicker::from_config(config);
        let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_BUFFER);
        let (outcome_tx, outcome_rx) = oneshot::channel();

        info!(
            request_id = %request.id,
            file = %request.file.name(),
            service = service.name(),
            "Starting conversion"
        );

        let driver = tokio::spawn(drive(
            service,
            request.clone(),
            ticker,
            progress_tx,
            outcome_tx,
        ));

        Self {
            request,
            progress_rx,
            outcome_rx,
            last_progress: 0,
            settled: false,
            driver,
        }
    }

    pub fn id(&self) -> Uuid {
        self.request.id
    }

    pub fn request(&self) -> &ConversionRequest {
        &self.request
    }

    /// Last progress value observed through [`next_event`](Self::next_event).
    pub fn progress(&self) -> u8 {
        self.last_progress
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Waits for the next progress update or the final result.
    ///
    /// Progress queued before the result is always delivered first. Returns
    /// `None` once the session has settled.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if self.settled {
            return None;
        }

        tokio::select! {
            biased;
            Some(value) = self.progress_rx.recv() => {
                self.last_progress = value;
                Some(SessionEvent::Progress(value))
            }
            outcome = &mut self.outcome_rx => {
                self.settled = true;
                Some(SessionEvent::Settled(
                    outcome.unwrap_or_else(|_| ConversionResult::cancelled()),
                ))
            }
        }
    }

    /// Drains progress and returns the final result.
    pub async fn wait(mut self) -> ConversionResult {
        while let Some(event) = self.next_event().await {
            if let SessionEvent::Settled(result) = event {
                return result;
            }
        }
        ConversionResult::cancelled()
    }

    /// Stops the ticker and stops reacting to the service reply.
    pub fn cancel(&self) {
        if !self.driver.is_finished() {
            debug!(request_id = %self.request.id, "Cancelling conversion");
        }
        self.driver.abort();
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.driver.abort_handle()
    }

    /// Whether the driver task (ticker included) has exited.
    pub fn is_finished(&self) -> bool {
        self.driver.is_finished()
    }
}

impl Drop for ConversionSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive(
    service: Arc<dyn ConversionService>,
    request: ConversionRequest,
    mut ticker: ProgressTicker,
    progress_tx: mpsc::Sender<u8>,
    outcome_tx: oneshot::Sender<ConversionResult>,
) {
    let request_id = request.id;
    let call = service.convert(&request.file);
    tokio::pin!(call);

    let reply = loop {
        tokio::select! {
            biased;
            reply = &mut call => break reply,
            value = ticker.tick() => {
                debug!(request_id = %request_id, progress = value, "Progress tick");
                let _ = progress_tx.send(value).await;
            }
        }
    };

    let result = match reply {
        Ok(response) => ConversionResult::from_response(response),
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "Conversion service call failed");
            ConversionResult::from_transport(e)
        }
    };

    match &result {
        ConversionResult::Success(output) => {
            info!(
                request_id = %request_id,
                media_url = %output.primary_media_url,
                "Conversion succeeded"
            );
            let _ = progress_tx.send(100).await;
        }
        ConversionResult::Failure(failure) => {
            info!(request_id = %request_id, error = %failure.error(), "Conversion failed");
        }
    }

    let _ = outcome_tx.send(result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::IntakeConfig;
    use crate::conversion::{ConversionError, ServiceError, ServiceResponse};
    use crate::intake::{FileCandidate, FileIntake};
    use crate::testing::MockConversionService;

    fn source_file() -> SourceFile {
        FileIntake::new(IntakeConfig::default())
            .submit(FileCandidate::new("score.png", None, vec![7; 64]))
            .unwrap()
    }

    async fn collect(session: &mut ConversionSession) -> (Vec<u8>, Option<ConversionResult>) {
        let mut progress = Vec::new();
        let mut result = None;
        while let Some(event) = session.next_event().await {
            match event {
                SessionEvent::Progress(value) => progress.push(value),
                SessionEvent::Settled(r) => result = Some(r),
            }
        }
        (progress, result)
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_caps_then_jumps_to_100() {
        let service = MockConversionService::new();
        service.set_delay(Duration::from_secs(10)).await;
        service
            .set_response(ServiceResponse::success("a.mp3", "a.mid"))
            .await;

        let mut session =
            ConversionSession::start(Arc::new(service), source_file(), &ConversionConfig::default());
        let (progress, result) = collect(&mut session).await;

        let mut expected: Vec<u8> = (1..=19).map(|i| i * 5).collect();
        expected.push(100);
        assert_eq!(progress, expected);
        assert!(result.unwrap().is_success());
        assert_eq!(session.progress(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_reply_skips_ticks() {
        let service = MockConversionService::new();
        service.set_delay(Duration::from_millis(450)).await;

        let mut session =
            ConversionSession::start(Arc::new(service), source_file(), &ConversionConfig::default());
        let (progress, result) = collect(&mut session).await;

        assert_eq!(progress, vec![5, 10, 100]);
        assert!(result.unwrap().is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_reply_freezes_progress() {
        let service = MockConversionService::new();
        service.set_delay(Duration::from_millis(1100)).await;
        service.set_response(ServiceResponse::failure()).await;

        let mut session =
            ConversionSession::start(Arc::new(service), source_file(), &ConversionConfig::default());
        let (progress, result) = collect(&mut session).await;

        assert_eq!(progress.last(), Some(&25));
        assert!(!progress.contains(&100));
        let result = result.unwrap();
        assert!(matches!(
            result.failure_ref().unwrap().error(),
            ConversionError::Rejected { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_normalized() {
        let service = MockConversionService::new();
        service.set_next_error(ServiceError::Timeout).await;

        let session =
            ConversionSession::start(Arc::new(service), source_file(), &ConversionConfig::default());
        let result = session.wait().await;

        assert!(matches!(
            result.failure_ref().unwrap().error(),
            ConversionError::Transport {
                source: ServiceError::Timeout
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_exits_after_settling() {
        let service = MockConversionService::new();
        let mut session =
            ConversionSession::start(Arc::new(service), source_file(), &ConversionConfig::default());
        collect(&mut session).await;

        tokio::task::yield_now().await;
        assert!(session.is_finished());
        assert!(session.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticker_and_discards_reply() {
        let service = MockConversionService::new();
        service.set_delay(Duration::from_secs(5)).await;

        let mut session = ConversionSession::start(
            Arc::new(service.clone()),
            source_file(),
            &ConversionConfig::default(),
        );
        assert!(matches!(session.next_event().await, Some(SessionEvent::Progress(5))));

        session.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(session.is_finished());
        match session.next_event().await {
            Some(SessionEvent::Settled(result)) => assert!(matches!(
                result.failure_ref().unwrap().error(),
                ConversionError::Cancelled
            )),
            other => panic!("expected cancelled settlement, got {other:?}"),
        }
        assert_eq!(service.completed_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_driver() {
        let service = MockConversionService::new();
        service.set_delay(Duration::from_secs(5)).await;

        let session = ConversionSession::start(
            Arc::new(service.clone()),
            source_file(),
            &ConversionConfig::default(),
        );
        // Let the driver reach the service call before dropping.
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(service.call_count().await, 1);

        let abort = session.abort_handle();
        drop(session);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(abort.is_finished());
        assert_eq!(service.call_count().await, 1);
        assert_eq!(service.completed_count().await, 0);
    }
}
