use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::api::{EffectRequest, GenerationApi, WavespeedClient};
use crate::assets::AssetPair;
use crate::catalog::Effect;
use crate::clock::{Clock, TokioClock};
use crate::config::{BatchConfig, Config, GenerationConfig};
use crate::download::Downloader;
use crate::media::FrameExtractor;
use crate::polling::Poller;
use crate::{AssetError, Result};

/// Cooperative cancellation flag shared between the signal handler and the runner
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once [`Shutdown::trigger`] has been called
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }

    /// Trigger on Ctrl+C
    pub fn listen_for_ctrl_c(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("⚠️  Interrupted by user");
                shutdown.trigger();
            }
        });
    }
}

/// Summary of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Effects selected for this run
    pub total: usize,
    /// Effects that reached a final outcome (including skipped ones)
    pub attempted: usize,
    /// Effects with a complete asset pair at the end of their turn
    pub succeeded: usize,
    /// Successes that were already on disk
    pub skipped: usize,
    pub failed: usize,
    pub failed_effects: Vec<String>,
    /// The run stopped early on user request
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub total_time: Duration,
}

impl BatchReport {
    fn new(total: usize) -> Self {
        Self {
            total,
            attempted: 0,
            succeeded: 0,
            skipped: 0,
            failed: 0,
            failed_effects: Vec::new(),
            interrupted: false,
            started_at: Utc::now(),
            total_time: Duration::ZERO,
        }
    }

    fn record(&mut self, effect: &Effect, outcome: &Result<EffectOutcome>) {
        self.attempted += 1;
        match outcome {
            Ok(EffectOutcome::Generated) => self.succeeded += 1,
            Ok(EffectOutcome::Skipped) => {
                self.succeeded += 1;
                self.skipped += 1;
            }
            Err(_) => {
                self.failed += 1;
                self.failed_effects.push(effect.name.to_string());
            }
        }
    }

    /// New files written during this run
    pub fn files_generated(&self) -> usize {
        (self.succeeded - self.skipped) * 2
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempted > 0 {
            self.succeeded as f64 / self.attempted as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Log the final summary
    pub fn log_summary(&self, output_dir: &Path) {
        info!("{}", "=".repeat(60));
        if self.interrupted {
            warn!("⚠️  Run interrupted after {}/{} effects", self.attempted, self.total);
        } else {
            info!("🎉 Processing completed in {:.1}s", self.total_time.as_secs_f64());
        }
        info!("✅ Succeeded: {}/{} ({} already present)", self.succeeded, self.total, self.skipped);
        info!("❌ Failed: {}/{}", self.failed, self.total);
        info!("📊 Success rate: {:.1}%", self.success_rate());

        if !self.failed_effects.is_empty() {
            info!("Failed effects:");
            for name in &self.failed_effects {
                info!("  - {}", name);
            }
        }

        info!("📁 Output directory: {}", output_dir.display());
        info!("📊 Files generated: {}", self.files_generated());
    }
}

/// Result of processing one effect that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOutcome {
    Generated,
    Skipped,
}

/// Runs the submit → poll → download → poster pipeline for each effect in turn
pub struct BatchRunner {
    api: Arc<dyn GenerationApi>,
    poller: Poller,
    downloader: Downloader,
    extractor: FrameExtractor,
    clock: Arc<dyn Clock>,
    generation: GenerationConfig,
    batch: BatchConfig,
    output_dir: PathBuf,
}

impl BatchRunner {
    pub fn new(
        config: &Config,
        api: Arc<dyn GenerationApi>,
        downloader: Downloader,
        extractor: FrameExtractor,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let poller = Poller::new(api.clone(), clock.clone(), &config.polling);
        Self {
            api,
            poller,
            downloader,
            extractor,
            clock,
            generation: config.generation.clone(),
            batch: config.batch.clone(),
            output_dir: config.output.dir.clone(),
        }
    }

    /// Runner wired to the Wavespeed API, ffmpeg and the wall clock
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = Arc::new(WavespeedClient::new(&config.api)?);
        let downloader = Downloader::new(config.api.download_timeout())?;
        let extractor = FrameExtractor::ffmpeg(&config.poster);
        Ok(Self::new(config, api, downloader, extractor, Arc::new(TokioClock)))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn request_for(&self, effect: &Effect) -> EffectRequest {
        EffectRequest {
            effect: effect.name.to_string(),
            image: self.generation.image_url.clone(),
            resolution: self.generation.resolution.clone(),
            duration: self.generation.duration,
            aspect_ratio: self.generation.aspect_ratio.clone(),
        }
    }

    /// Process `effects` in order and report the outcome.
    ///
    /// A failing effect is recorded and the run moves on; only `shutdown` stops the
    /// run early. Files already written stay in place.
    pub async fn run(&self, effects: &[Effect], shutdown: &Shutdown) -> Result<BatchReport> {
        if effects.is_empty() {
            return Err(AssetError::Config("No effects selected".to_string()));
        }
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let start_time = Instant::now();
        let total = effects.len();
        let mut report = BatchReport::new(total);

        info!("🎬 Processing {} effects...", total);
        info!("📝 Source image: {}", self.generation.image_url);
        info!(
            "💰 Estimated cost: ${:.2} ({}, {}s)",
            total as f64 * self.generation.cost_per_effect_usd,
            self.generation.resolution,
            self.generation.duration
        );

        for (index, effect) in effects.iter().enumerate() {
            if shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }

            info!("{}", "=".repeat(60));
            info!("[{}/{}] {} ({})", index + 1, total, effect.name, effect.id);

            let outcome = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                outcome = self.process_effect(effect) => Some(outcome),
            };

            let Some(outcome) = outcome else {
                report.interrupted = true;
                break;
            };

            match &outcome {
                Ok(EffectOutcome::Generated) => info!("✅ {} done", effect.id),
                Ok(EffectOutcome::Skipped) => {}
                Err(e) => error!("❌ {} failed: {}", effect.name, e),
            }
            report.record(effect, &outcome);

            if index + 1 < total && !self.batch.inter_item_delay().is_zero() {
                info!("⏸️  Waiting {}s...", self.batch.inter_item_delay_seconds);
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        report.interrupted = true;
                        break;
                    }
                    _ = self.clock.sleep(self.batch.inter_item_delay()) => {}
                }
            }
        }

        if report.interrupted {
            warn!("⚠️  Stopped after {}/{} effects", report.attempted, total);
        }
        report.total_time = start_time.elapsed();
        Ok(report)
    }

    /// Generate the asset pair of a single effect unless it already exists
    pub async fn process_effect(&self, effect: &Effect) -> Result<EffectOutcome> {
        let pair = AssetPair::new(&self.output_dir, effect.id);
        if self.batch.skip_existing && pair.is_complete() {
            info!("⏭️  Assets already exist, skipping: {}", effect.id);
            return Ok(EffectOutcome::Skipped);
        }

        info!("🚀 Submitting effect: {}", effect.name);
        let job_id = self.api.submit(&self.request_for(effect)).await?;
        info!("✅ Request submitted, job id: {}", job_id);

        let video_url = self.poller.wait_for_output(&job_id, effect.name).await?;
        self.downloader.download(&video_url, pair.video_path()).await?;
        self.extractor
            .extract_poster(pair.video_path(), pair.poster_path())
            .await?;

        Ok(EffectOutcome::Generated)
    }
}

/// Outcome of rebuilding posters from videos already on disk
#[derive(Debug, Clone, Default, Serialize)]
pub struct PosterReport {
    pub succeeded: usize,
    pub failed: Vec<(String, String)>,
    pub interrupted: bool,
}

/// Re-extract the poster of every pair in `pairs`, overwriting existing posters
pub async fn regenerate_posters(
    extractor: &FrameExtractor,
    pairs: &[AssetPair],
    shutdown: &Shutdown,
) -> PosterReport {
    let mut report = PosterReport::default();
    let total = pairs.len();

    for (index, pair) in pairs.iter().enumerate() {
        if shutdown.is_triggered() {
            report.interrupted = true;
            break;
        }

        info!("[{}/{}] 🖼️  {}", index + 1, total, pair.id());
        match extractor
            .extract_poster(pair.video_path(), pair.poster_path())
            .await
        {
            Ok(_) => report.succeeded += 1,
            Err(e) => {
                error!("❌ {} failed: {}", pair.id(), e);
                report.failed.push((pair.id().to_string(), e.to_string()));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::JobStatus;
    use crate::catalog;
    use crate::clock::ManualClock;
    use crate::config::ConfigBuilder;
    use crate::media::testing::{FakeVideo, RecordingEncoder};
    use crate::media::WebpOptions;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Counts calls; submissions fail, or hang after triggering `shutdown` when set
    #[derive(Default)]
    struct StubApi {
        submissions: Mutex<Vec<EffectRequest>>,
        status_queries: Mutex<usize>,
        shutdown_on_submit: Option<Shutdown>,
    }

    #[async_trait]
    impl GenerationApi for StubApi {
        async fn submit(&self, request: &EffectRequest) -> Result<String> {
            self.submissions.lock().unwrap().push(request.clone());
            if let Some(shutdown) = &self.shutdown_on_submit {
                shutdown.trigger();
                std::future::pending::<()>().await;
            }
            Err(AssetError::Request {
                status: 401,
                body: "unauthorized".to_string(),
            })
        }

        async fn status(&self, _job_id: &str) -> Result<JobStatus> {
            *self.status_queries.lock().unwrap() += 1;
            Err(AssetError::MalformedResponse("unexpected".to_string()))
        }
    }

    /// Triggers `shutdown` as soon as the runner starts waiting, then never wakes
    struct CancellingClock {
        shutdown: Shutdown,
        sleeps: Mutex<usize>,
    }

    #[async_trait]
    impl Clock for CancellingClock {
        fn now(&self) -> Instant {
            Instant::now()
        }

        async fn sleep(&self, _duration: Duration) {
            *self.sleeps.lock().unwrap() += 1;
            self.shutdown.trigger();
            std::future::pending::<()>().await;
        }
    }

    fn runner(dir: &TempDir, api: Arc<StubApi>, clock: Arc<dyn Clock>) -> BatchRunner {
        let config = ConfigBuilder::new()
            .with_api_key("test")
            .with_output_dir(dir.path().to_path_buf())
            .build();
        let extractor = FrameExtractor::new(
            Arc::new(FakeVideo::with_frames(10)),
            Arc::new(RecordingEncoder::default()),
            WebpOptions::default(),
        );
        BatchRunner::new(
            &config,
            api,
            Downloader::new(Duration::from_secs(5)).unwrap(),
            extractor,
            clock,
        )
    }

    fn effects(ids: &[&str]) -> Vec<Effect> {
        let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        catalog::select(&ids).unwrap()
    }

    #[tokio::test]
    async fn test_existing_assets_skip_network_calls() {
        let temp_dir = TempDir::new().unwrap();
        for id in ["kiss-me-ai", "hulk"] {
            let pair = AssetPair::new(temp_dir.path(), id);
            tokio::fs::write(pair.video_path(), b"video").await.unwrap();
            tokio::fs::write(pair.poster_path(), b"poster").await.unwrap();
        }
        let api = Arc::new(StubApi::default());
        let clock = Arc::new(ManualClock::new());

        let report = runner(&temp_dir, api.clone(), clock.clone())
            .run(&effects(&["kiss-me-ai", "hulk"]), &Shutdown::new())
            .await
            .unwrap();

        assert!(api.submissions.lock().unwrap().is_empty());
        assert_eq!(*api.status_queries.lock().unwrap(), 0);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.files_generated(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_recorded_and_batch_continues() {
        let temp_dir = TempDir::new().unwrap();
        // Video without poster must be regenerated
        let partial = AssetPair::new(temp_dir.path(), "hulk");
        tokio::fs::write(partial.video_path(), b"video").await.unwrap();

        let api = Arc::new(StubApi::default());
        let clock = Arc::new(ManualClock::new());

        let report = runner(&temp_dir, api.clone(), clock.clone())
            .run(&effects(&["kiss-me-ai", "hulk", "venom"]), &Shutdown::new())
            .await
            .unwrap();

        let submitted: Vec<String> = api
            .submissions
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.effect.clone())
            .collect();
        assert_eq!(submitted, vec!["Kiss Me AI", "Hulk", "Venom"]);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.failed, 3);
        assert_eq!(report.failed_effects, vec!["Kiss Me AI", "Hulk", "Venom"]);
        assert!(!report.interrupted);
        // Delay between items only, not after the last one
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5); 2]);
    }

    #[tokio::test]
    async fn test_request_uses_generation_settings() {
        let temp_dir = TempDir::new().unwrap();
        let api = Arc::new(StubApi::default());

        runner(&temp_dir, api.clone(), Arc::new(ManualClock::new()))
            .run(&effects(&["black-myth-wukong"]), &Shutdown::new())
            .await
            .unwrap();

        let submissions = api.submissions.lock().unwrap();
        assert_eq!(
            submissions[0],
            EffectRequest {
                effect: "Black Myth: Wukong".to_string(),
                image: GenerationConfig::default().image_url,
                resolution: "720p".to_string(),
                duration: 5,
                aspect_ratio: "16:9".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_cancellation_stops_immediately() {
        let temp_dir = TempDir::new().unwrap();
        let shutdown = Shutdown::new();
        let api = Arc::new(StubApi {
            shutdown_on_submit: Some(shutdown.clone()),
            ..StubApi::default()
        });

        let report = runner(&temp_dir, api.clone(), Arc::new(ManualClock::new()))
            .run(&effects(&["kiss-me-ai", "hulk", "venom"]), &shutdown)
            .await
            .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.attempted, 0);
        assert_eq!(report.total, 3);
        assert_eq!(api.submissions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_inter_item_delay() {
        let temp_dir = TempDir::new().unwrap();
        for id in ["kiss-me-ai", "hulk"] {
            let pair = AssetPair::new(temp_dir.path(), id);
            tokio::fs::write(pair.video_path(), b"video").await.unwrap();
            tokio::fs::write(pair.poster_path(), b"poster").await.unwrap();
        }
        let shutdown = Shutdown::new();
        let clock = Arc::new(CancellingClock {
            shutdown: shutdown.clone(),
            sleeps: Mutex::new(0),
        });
        let api = Arc::new(StubApi::default());

        let report = runner(&temp_dir, api.clone(), clock.clone())
            .run(&effects(&["kiss-me-ai", "hulk", "venom"]), &shutdown)
            .await
            .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.attempted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(*clock.sleeps.lock().unwrap(), 1);
        assert!(api.submissions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_regenerate_posters_overwrites_and_reports() {
        let temp_dir = TempDir::new().unwrap();
        let good = AssetPair::new(temp_dir.path(), "hug");
        tokio::fs::write(good.video_path(), b"video").await.unwrap();
        tokio::fs::write(good.poster_path(), b"stale").await.unwrap();
        let single = AssetPair::new(temp_dir.path(), "robot");
        tokio::fs::write(single.video_path(), b"video").await.unwrap();

        let source = Arc::new(FakeVideo::with_frames(3));
        let encoder = Arc::new(RecordingEncoder::default());
        let extractor = FrameExtractor::new(source.clone(), encoder.clone(), WebpOptions::default());

        let report = regenerate_posters(&extractor, &[good.clone(), single.clone()], &Shutdown::new()).await;

        assert_eq!(report.succeeded, 2);
        assert!(report.failed.is_empty());
        assert_eq!(source.reads(), vec![2, 2]);
        assert!(single.has_poster());
        assert_eq!(encoder.frames.lock().unwrap().len(), 2);
        assert_ne!(tokio::fs::read(good.poster_path()).await.unwrap(), b"stale");
    }

    #[tokio::test]
    async fn test_regenerate_posters_records_failures() {
        let temp_dir = TempDir::new().unwrap();
        let pair = AssetPair::new(temp_dir.path(), "hug");
        tokio::fs::write(pair.video_path(), b"video").await.unwrap();

        let source = Arc::new(FakeVideo {
            decodable: false,
            ..FakeVideo::with_frames(3)
        });
        let extractor = FrameExtractor::new(
            source,
            Arc::new(RecordingEncoder::default()),
            WebpOptions::default(),
        );

        let report = regenerate_posters(&extractor, &[pair], &Shutdown::new()).await;

        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "hug");
    }

    #[tokio::test]
    async fn test_empty_selection_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = runner(&temp_dir, Arc::new(StubApi::default()), Arc::new(ManualClock::new()))
            .run(&[], &Shutdown::new())
            .await;
        assert!(matches!(result, Err(AssetError::Config(_))));
    }
}
