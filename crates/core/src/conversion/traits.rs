//! Trait definitions for the conversion module.

use async_trait::async_trait;

use super::error::ServiceError;
use super::types::ServiceResponse;
use crate::intake::SourceFile;

/// The external image-to-music recognition service.
///
/// Implementations report service-level failures through
/// `ServiceResponse::success == false` and transport or processing faults
/// through `Err`. Both end up as a failed [`ConversionResult`](super::ConversionResult).
#[async_trait]
pub trait ConversionService: Send + Sync {
    /// Returns the name of this service implementation.
    fn name(&self) -> &str;

    /// Submits a file for conversion and waits for the service reply.
    async fn convert(&self, file: &SourceFile) -> Result<ServiceResponse, ServiceError>;
}
