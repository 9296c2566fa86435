use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::models::{ApiResponse, PredictionData, SubmitData};
use super::{EffectRequest, GenerationApi, JobStatus};
use crate::config::ApiConfig;
use crate::{AssetError, Result};

const EFFECTS_PATH: &str = "pixverse/pixverse-v5-effects";

/// Authenticated JSON client for the Wavespeed v3 API
#[derive(Clone)]
pub struct WavespeedClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl WavespeedClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AssetError::Config("Wavespeed API key required".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Issue an authenticated request and parse the JSON body.
    ///
    /// Any non-2xx status becomes [`AssetError::Request`] carrying the status and body.
    pub async fn request<B, T>(&self, method: Method, url: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(request_error(status, response.text().await.unwrap_or_default()));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn request_error(status: StatusCode, body: String) -> AssetError {
    AssetError::Request {
        status: status.as_u16(),
        body,
    }
}

#[async_trait]
impl GenerationApi for WavespeedClient {
    async fn submit(&self, request: &EffectRequest) -> Result<String> {
        let url = self.endpoint(EFFECTS_PATH);
        let response: ApiResponse<SubmitData> =
            self.request(Method::POST, &url, Some(request)).await?;
        response.into_job_id()
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus> {
        let url = self.endpoint(&format!("predictions/{}/result", job_id));
        let response: ApiResponse<PredictionData> = self
            .request::<(), _>(Method::GET, &url, None)
            .await
            .map_err(|e| match e {
                AssetError::Json(json) => AssetError::MalformedResponse(json.to_string()),
                other => other,
            })?;
        response.into_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_api_key() {
        let config = ApiConfig::default();
        assert!(matches!(
            WavespeedClient::new(&config),
            Err(AssetError::Config(_))
        ));
    }

    #[test]
    fn test_endpoints_ignore_trailing_slash() {
        let config = ApiConfig {
            base_url: "https://api.example.test/api/v3/".to_string(),
            api_key: Some("key".to_string()),
            ..ApiConfig::default()
        };
        let client = WavespeedClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint(EFFECTS_PATH),
            "https://api.example.test/api/v3/pixverse/pixverse-v5-effects"
        );
    }
}
