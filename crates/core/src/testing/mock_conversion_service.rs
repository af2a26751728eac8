//! Mock conversion service for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::conversion::{ConversionService, ServiceError, ServiceResponse};
use crate::intake::SourceFile;

/// A recorded service call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub file_name: String,
    pub media_type: String,
    pub size_bytes: u64,
}

/// Mock implementation of the ConversionService trait.
///
/// Provides controllable behavior for testing:
/// - Simulated processing time (virtual under a paused tokio clock)
/// - Configurable reply, including rejections
/// - One-shot transport errors
/// - Separate counts for started and completed calls, so tests can tell
///   whether an abandoned call was actually dropped
#[derive(Debug, Clone)]
pub struct MockConversionService {
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    completed: Arc<RwLock<usize>>,
    response: Arc<RwLock<ServiceResponse>>,
    /// If set, the next call fails with this error.
    next_error: Arc<RwLock<Option<ServiceError>>>,
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockConversionService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConversionService {
    /// Create a mock that succeeds after 100ms.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            completed: Arc::new(RwLock::new(0)),
            response: Arc::new(RwLock::new(ServiceResponse::success(
                "/download/mock.mp3",
                "/download/mock.mid",
            ))),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::from_millis(100))),
        }
    }

    pub async fn set_response(&self, response: ServiceResponse) {
        *self.response.write().await = response;
    }

    pub async fn set_next_error(&self, error: ServiceError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Calls started, including abandoned ones.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Calls that ran to completion.
    pub async fn completed_count(&self) -> usize {
        *self.completed.read().await
    }

    async fn take_error(&self) -> Option<ServiceError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl ConversionService for MockConversionService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn convert(&self, file: &SourceFile) -> Result<ServiceResponse, ServiceError> {
        self.calls.write().await.push(RecordedCall {
            file_name: file.name().to_string(),
            media_type: file.media_type().to_string(),
            size_bytes: file.size_bytes(),
        });

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        *self.completed.write().await += 1;
        Ok(self.response.read().await.clone())
    }
}
