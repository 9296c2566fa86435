/// Effect Assets - preview generation for the video-effects catalog
///
/// Submits each catalog effect to the Wavespeed generation API, polls the job until it
/// finishes, downloads the rendered video and extracts a WebP poster from its last frame.

pub mod api;
pub mod assets;
pub mod batch;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod download;
pub mod media;
pub mod polling;

// Re-export main types for easy access
pub use crate::api::{EffectRequest, GenerationApi, JobState, JobStatus, WavespeedClient};
pub use crate::assets::AssetPair;
pub use crate::batch::{BatchReport, BatchRunner, Shutdown};
pub use crate::catalog::{Effect, CATALOG};
pub use crate::clock::{Clock, TokioClock};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::download::Downloader;
pub use crate::media::{FfmpegBackend, Frame, FrameExtractor, PixelLayout};
pub use crate::polling::Poller;

use std::path::PathBuf;
use std::time::Duration;

/// Result type for asset generation operations
pub type Result<T> = std::result::Result<T, AssetError>;

/// Error types for asset generation operations
#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("Request failed with status {status}: {body}")]
    Request { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed API response: {0}")]
    MalformedResponse(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Job {job_id} did not finish within {waited:?}")]
    PollTimeout { job_id: String, waited: Duration },

    #[error("Job {job_id} completed without any output")]
    EmptyOutput { job_id: String },

    #[error("Download error: {0}")]
    Download(String),

    #[error("Cannot read frame {index} from {}", .path.display())]
    FrameRead { path: PathBuf, index: u64 },

    #[error("Media tool error: {0}")]
    Media(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AssetError {
    /// Whether a status poll that hit this error may simply be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AssetError::Http(_)
                | AssetError::Request { .. }
                | AssetError::MalformedResponse(_)
                | AssetError::Json(_)
        )
    }
}
