//! Generation API client
//!
//! The [`GenerationApi`] trait is the seam between the pipeline and the remote
//! service; [`WavespeedClient`] is the HTTP implementation.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::Result;

pub mod models;
pub mod wavespeed;

pub use wavespeed::WavespeedClient;

/// Body of a generation submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectRequest {
    /// Effect display name
    pub effect: String,
    /// URL of the source image
    pub image: String,
    pub resolution: String,
    pub duration: u32,
    pub aspect_ratio: String,
}

/// Server-side state of a generation job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    /// Any other status string the service reports; treated as in progress
    Other(String),
}

impl JobState {
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "pending" => JobState::Pending,
            "processing" => JobState::Processing,
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            other => JobState::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => write!(f, "pending"),
            JobState::Processing => write!(f, "processing"),
            JobState::Completed => write!(f, "completed"),
            JobState::Failed => write!(f, "failed"),
            JobState::Other(status) => write!(f, "{}", status),
        }
    }
}

/// One status observation of a generation job
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub state: JobState,
    pub progress: Option<f64>,
    pub outputs: Vec<String>,
    pub error: Option<String>,
}

impl JobStatus {
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            progress: None,
            outputs: Vec::new(),
            error: None,
        }
    }

    pub fn with_outputs(mut self, outputs: Vec<String>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Remote video generation service
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Submit a generation request and return the job id
    async fn submit(&self, request: &EffectRequest) -> Result<String>;

    /// Query the current status of a job
    async fn status(&self, job_id: &str) -> Result<JobStatus>;
}
