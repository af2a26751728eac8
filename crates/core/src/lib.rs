pub mod config;
pub mod conversion;
pub mod download;
pub mod intake;
pub mod playback;
pub mod testing;
pub mod workflow;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ConversionConfig,
    DownloadConfig, IntakeConfig,
};
pub use conversion::{
    ConversionError, ConversionOutput, ConversionResult, ConversionService, ConversionSession,
    HttpConversionService, ProgressTicker, ServiceError, ServiceResponse,
};
pub use download::{Downloader, HttpDownloader};
pub use intake::{FileCandidate, FileIntake, IntakeError, PreviewArtifact, SourceFile};
pub use playback::{
    format_time, MediaBackend, MediaEvent, MediaHandle, PlaybackController, PlaybackError,
    PlaybackSession,
};
pub use workflow::{Stage, Workflow, WorkflowError, WorkflowEvent, WorkflowSnapshot};
