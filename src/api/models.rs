//! Wire formats of the Wavespeed v3 API

use serde::Deserialize;

use super::{JobState, JobStatus};
use crate::{AssetError, Result};

/// Response wrapper: every payload sits under `data`
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `data` of a submission response
#[derive(Debug, Deserialize)]
pub struct SubmitData {
    pub id: Option<String>,
}

/// `data` of a prediction result response
#[derive(Debug, Deserialize)]
pub struct PredictionData {
    pub status: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub outputs: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiResponse<SubmitData> {
    pub fn into_job_id(self) -> Result<String> {
        self.data
            .and_then(|data| data.id)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                AssetError::MalformedResponse(format!(
                    "submission response has no data.id{}",
                    self.message
                        .map(|m| format!(" ({})", m))
                        .unwrap_or_default()
                ))
            })
    }
}

impl ApiResponse<PredictionData> {
    pub fn into_status(self) -> Result<JobStatus> {
        let data = self.data.ok_or_else(|| {
            AssetError::MalformedResponse("status response has no data".to_string())
        })?;
        let status = data.status.ok_or_else(|| {
            AssetError::MalformedResponse("status response has no data.status".to_string())
        })?;

        Ok(JobStatus {
            state: JobState::parse(&status),
            progress: data.progress,
            outputs: data.outputs.unwrap_or_default(),
            error: data.error.filter(|e| !e.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_from_nested_data() {
        let response: ApiResponse<SubmitData> =
            serde_json::from_str(r#"{"code":200,"data":{"id":"abc123","status":"created"}}"#)
                .unwrap();
        assert_eq!(response.into_job_id().unwrap(), "abc123");
    }

    #[test]
    fn test_missing_job_id_is_malformed() {
        let response: ApiResponse<SubmitData> =
            serde_json::from_str(r#"{"data":{},"message":"quota exceeded"}"#).unwrap();
        let err = response.into_job_id().unwrap_err();
        assert!(matches!(err, AssetError::MalformedResponse(ref m) if m.contains("quota exceeded")));
    }

    #[test]
    fn test_completed_status_with_outputs() {
        let response: ApiResponse<PredictionData> = serde_json::from_str(
            r#"{"data":{"status":"completed","outputs":["https://example/video.mp4"],"error":""}}"#,
        )
        .unwrap();
        let status = response.into_status().unwrap();
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.outputs, vec!["https://example/video.mp4".to_string()]);
        assert!(status.error.is_none());
    }

    #[test]
    fn test_status_without_status_field_is_malformed() {
        let response: ApiResponse<PredictionData> =
            serde_json::from_str(r#"{"data":{"progress":40}}"#).unwrap();
        assert!(matches!(
            response.into_status(),
            Err(AssetError::MalformedResponse(_))
        ));
    }
}
