use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the effect asset generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation API connection settings
    pub api: ApiConfig,

    /// Parameters sent with every generation request
    pub generation: GenerationConfig,

    /// Job status polling settings
    pub polling: PollingConfig,

    /// Batch pacing settings
    pub batch: BatchConfig,

    /// Output and storage settings
    pub output: OutputConfig,

    /// Poster encoding settings
    pub poster: PosterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the Wavespeed v3 API
    pub base_url: String,

    /// Bearer token; normally supplied through `WAVESPEED_API_KEY`
    pub api_key: Option<String>,

    /// Timeout for a single HTTP request in seconds
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Source image every effect is applied to
    pub image_url: String,

    /// Output resolution, e.g. "720p"
    pub resolution: String,

    /// Clip duration in seconds
    pub duration: u32,

    /// Aspect ratio, e.g. "16:9"
    pub aspect_ratio: String,

    /// Estimated price of one generation in USD, only used for logging
    pub cost_per_effect_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between status checks while the job is in progress
    pub interval_seconds: u64,

    /// Delay after a failed status check
    pub error_backoff_seconds: u64,

    /// Give up on a job after this many seconds
    pub max_wait_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Pause between two effects
    pub inter_item_delay_seconds: u64,

    /// Skip effects whose video and poster already exist
    pub skip_existing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving `<id>_video.mp4` and `<id>_poster.webp`
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterConfig {
    /// Lossy WebP quality (0-100)
    pub quality: u8,

    /// WebP compression effort (0-6)
    pub compression_effort: u8,

    /// ffmpeg executable
    pub ffmpeg_path: PathBuf,

    /// ffprobe executable
    pub ffprobe_path: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.wavespeed.ai/api/v3".to_string(),
            api_key: None,
            request_timeout_seconds: 60,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            image_url: "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=800&q=80"
                .to_string(),
            resolution: "720p".to_string(),
            duration: 5,
            aspect_ratio: "16:9".to_string(),
            cost_per_effect_usd: 0.2,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 10,
            error_backoff_seconds: 5,
            max_wait_seconds: 300, // 5 minutes per job
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            inter_item_delay_seconds: 5,
            skip_existing: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("static/video-effects"),
        }
    }
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            quality: 85,
            compression_effort: 6,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            generation: GenerationConfig::default(),
            polling: PollingConfig::default(),
            batch: BatchConfig::default(),
            output: OutputConfig::default(),
            poster: PosterConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Videos can be large; allow ten times the JSON request timeout
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.saturating_mul(10))
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_seconds)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_seconds)
    }
}

impl BatchConfig {
    pub fn inter_item_delay(&self) -> Duration {
        Duration::from_secs(self.inter_item_delay_seconds)
    }
}

impl Config {
    /// Load configuration from an explicit file, the default locations, or defaults.
    ///
    /// Environment overrides are applied last in every case.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::from_default_locations(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config file {}: {}", path.display(), e))?;
        let config = toml::from_str(&config_str)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    fn from_default_locations() -> Self {
        let config_paths = ["effect-assets.toml", "config/effect-assets.toml"];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("No configuration file found, using defaults");
        Self::default()
    }

    /// Override settings from environment variables
    pub fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("WAVESPEED_API_KEY") {
            if !api_key.trim().is_empty() {
                self.api.api_key = Some(api_key.trim().to_string());
            }
        }

        if let Ok(base_url) = std::env::var("WAVESPEED_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(output_dir) = std::env::var("EFFECT_ASSETS_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(output_dir);
        }

        if let Ok(image_url) = std::env::var("EFFECT_ASSETS_IMAGE_URL") {
            self.generation.image_url = image_url;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self.api.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(anyhow!("WAVESPEED_API_KEY is not set")),
        }

        if url::Url::parse(&self.api.base_url).is_err() {
            return Err(anyhow!("Invalid API base URL: {}", self.api.base_url));
        }

        if self.api.request_timeout_seconds == 0 {
            return Err(anyhow!("api.request_timeout_seconds must be greater than 0"));
        }

        if self.polling.interval_seconds == 0 {
            return Err(anyhow!("polling.interval_seconds must be greater than 0"));
        }

        if self.polling.max_wait_seconds == 0 {
            return Err(anyhow!("polling.max_wait_seconds must be greater than 0"));
        }

        if self.poster.quality > 100 {
            return Err(anyhow!("poster.quality must be between 0 and 100"));
        }

        if self.poster.compression_effort > 6 {
            return Err(anyhow!("poster.compression_effort must be between 0 and 6"));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Effect Assets Configuration:\n\
            - API: {}\n\
            - Source Image: {}\n\
            - Output: {} {}s {}\n\
            - Poll Interval: {}s (timeout {}s)\n\
            - Output Directory: {}\n\
            - Poster: WebP q{} effort {}",
            self.api.base_url,
            self.generation.image_url,
            self.generation.resolution,
            self.generation.duration,
            self.generation.aspect_ratio,
            self.polling.interval_seconds,
            self.polling.max_wait_seconds,
            self.output.dir.display(),
            self.poster.quality,
            self.poster.compression_effort,
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.api.base_url = base_url.into();
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.dir = dir;
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.config.generation.image_url = image_url.into();
        self
    }

    pub fn with_poll_timing(mut self, interval: u64, error_backoff: u64, max_wait: u64) -> Self {
        self.config.polling.interval_seconds = interval;
        self.config.polling.error_backoff_seconds = error_backoff;
        self.config.polling.max_wait_seconds = max_wait;
        self
    }

    pub fn with_inter_item_delay(mut self, seconds: u64) -> Self {
        self.config.batch.inter_item_delay_seconds = seconds;
        self
    }

    pub fn skip_existing(mut self, skip: bool) -> Self {
        self.config.batch.skip_existing = skip;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.polling.interval(), Duration::from_secs(10));
        assert_eq!(config.polling.error_backoff(), Duration::from_secs(5));
        assert_eq!(config.batch.inter_item_delay(), Duration::from_secs(5));
        assert_eq!(config.poster.quality, 85);
        assert_eq!(config.poster.compression_effort, 6);
        assert!(config.api.api_key.is_none());
    }

    #[test]
    fn test_validation_requires_api_key() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let config = ConfigBuilder::new().with_api_key("secret").build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_poster_settings() {
        let mut config = ConfigBuilder::new().with_api_key("secret").build();
        config.poster.compression_effort = 7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_request_timeout() {
        let mut config = ConfigBuilder::new().with_api_key("secret").build();
        config.api.request_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_download_timeout_saturates() {
        let mut config = Config::default();
        assert_eq!(config.api.download_timeout(), Duration::from_secs(600));

        config.api.request_timeout_seconds = u64::MAX;
        assert_eq!(config.api.download_timeout(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("effect-assets.toml");
        std::fs::write(
            &path,
            "[polling]\ninterval_seconds = 3\n\n[output]\ndir = \"out\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.polling.interval_seconds, 3);
        assert_eq!(config.polling.max_wait_seconds, 300);
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert_eq!(config.generation.resolution, "720p");
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_base_url("http://127.0.0.1:9999")
            .with_poll_timing(1, 1, 30)
            .with_inter_item_delay(0)
            .build();

        assert_eq!(config.api.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.polling.max_wait(), Duration::from_secs(30));
        assert_eq!(config.batch.inter_item_delay(), Duration::ZERO);
    }
}
