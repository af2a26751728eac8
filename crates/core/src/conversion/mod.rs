//! Conversion session: one attempt to turn a source file into playable and
//! downloadable media through an external recognition service.
//!
//! A [`ConversionSession`] runs the service call concurrently with a
//! [`ProgressTicker`] that emits simulated progress (`+step` every interval,
//! capped below 100 until the real result arrives). Every outcome of the
//! service call, including transport faults, is normalized into a
//! [`ConversionResult`]; nothing escapes the session boundary as a panic or an
//! unhandled error.
//!
//! # Example
//!
//! ```ignore
//! use musescan_core::conversion::{ConversionSession, HttpConversionService, SessionEvent};
//!
//! let service = Arc::new(HttpConversionService::new(config.conversion.clone())?);
//! let mut session = ConversionSession::start(service, file, &config.conversion);
//!
//! while let Some(event) = session.next_event().await {
//!     match event {
//!         SessionEvent::Progress(percent) => println!("{percent}%"),
//!         SessionEvent::Settled(result) => println!("done: {}", result.is_success()),
//!     }
//! }
//! ```

mod error;
mod http;
mod session;
mod ticker;
mod traits;
mod types;

pub use error::{ConversionError, ServiceError};
pub use http::HttpConversionService;
pub use session::{ConversionSession, SessionEvent, PROGRESS_BUFFER};
pub use ticker::ProgressTicker;
pub use traits::ConversionService;
pub use types::{
    ConversionFailure, ConversionOutput, ConversionRequest, ConversionResult, ServiceResponse,
};
