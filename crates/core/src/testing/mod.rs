//! Testing utilities and mock implementations.
//!
//! Every external seam of the workflow has a mock here, so the full
//! select/convert/play lifecycle can run without a conversion service or an
//! audio device.
//!
//! # Example
//!
//! ```rust,ignore
//! use musescan_core::testing::{fixtures, MockConversionService, MockMediaBackend};
//!
//! let service = MockConversionService::new();
//! service.set_delay(Duration::from_secs(2)).await;
//! service.set_response(ServiceResponse::success("a.mp3", "a.mid")).await;
//!
//! let workflow = Workflow::new(&Config::default(), Arc::new(service.clone()))
//!     .with_playback(Arc::new(MockMediaBackend::new()));
//! workflow.select_file(fixtures::png_candidate("score.png", 1024)).await?;
//! ```

mod mock_conversion_service;
mod mock_downloader;
mod mock_media_backend;

pub use mock_conversion_service::{MockConversionService, RecordedCall};
pub use mock_downloader::{MockDownloader, RecordedDownload};
pub use mock_media_backend::{MockHandleState, MockMediaBackend};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::intake::FileCandidate;

    /// Create a candidate with an explicit media type and `size` bytes of filler.
    pub fn candidate(name: &str, media_type: &str, size: usize) -> FileCandidate {
        FileCandidate::new(name, Some(media_type.to_string()), vec![0x5a; size])
    }

    /// Create a PNG candidate.
    pub fn png_candidate(name: &str, size: usize) -> FileCandidate {
        candidate(name, "image/png", size)
    }

    /// Create a PDF candidate.
    pub fn pdf_candidate(name: &str, size: usize) -> FileCandidate {
        candidate(name, "application/pdf", size)
    }

    /// Create a candidate of a type the intake rejects.
    pub fn text_candidate(name: &str) -> FileCandidate {
        candidate(name, "text/plain", 16)
    }
}
