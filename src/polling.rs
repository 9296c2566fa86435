use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::{GenerationApi, JobState};
use crate::clock::Clock;
use crate::config::PollingConfig;
use crate::{AssetError, Result};

/// Polls a generation job until it reaches a terminal state or the time budget runs out
#[derive(Clone)]
pub struct Poller {
    api: Arc<dyn GenerationApi>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    error_backoff: Duration,
    max_wait: Duration,
}

impl Poller {
    pub fn new(api: Arc<dyn GenerationApi>, clock: Arc<dyn Clock>, config: &PollingConfig) -> Self {
        Self {
            api,
            clock,
            interval: config.interval(),
            error_backoff: config.error_backoff(),
            max_wait: config.max_wait(),
        }
    }

    /// Wait for `job_id` to finish and return the URL of its first output.
    ///
    /// `label` is only used in log lines.
    pub async fn wait_for_output(&self, job_id: &str, label: &str) -> Result<String> {
        let started = self.clock.now();

        while self.clock.now().duration_since(started) < self.max_wait {
            let status = match self.api.status(job_id).await {
                Ok(status) => status,
                Err(e) if e.is_transient() => {
                    warn!("❌ Poll error for {}: {}", label, e);
                    self.clock.sleep(self.error_backoff).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match status.state {
                JobState::Completed => {
                    return match status.outputs.into_iter().next() {
                        Some(url) => {
                            info!("✅ Generation completed: {}", label);
                            info!("   Video URL: {}", url);
                            Ok(url)
                        }
                        None => Err(AssetError::EmptyOutput {
                            job_id: job_id.to_string(),
                        }),
                    };
                }
                JobState::Failed => {
                    let message = status.error.unwrap_or_else(|| "Unknown error".to_string());
                    return Err(AssetError::GenerationFailed(message));
                }
                state => {
                    info!(
                        "⏳ Processing {}: {} ({}%)",
                        label,
                        state,
                        status.progress.unwrap_or(0.0)
                    );
                    self.clock.sleep(self.interval).await;
                }
            }
        }

        Err(AssetError::PollTimeout {
            job_id: job_id.to_string(),
            waited: self.clock.now().duration_since(started),
        })
    }
}
