use anyhow::{bail, Result};
use clap::Parser;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;
use std::path::PathBuf;
use tracing::{info, warn};

use effect_assets::assets::{missing_posters, scan_videos};
use effect_assets::batch::regenerate_posters;
use effect_assets::media::FfmpegBackend;
use effect_assets::{Config, FrameExtractor, Shutdown};

#[derive(Parser)]
#[command(name = "regenerate-posters")]
#[command(about = "Rebuild poster images from videos already in the output directory")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding `<id>_video.mp4` files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Only create posters that are missing
    #[arg(long)]
    missing_only: bool,

    /// Overwrite without asking
    #[arg(short, long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter("info")
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(output_dir) = cli.output_dir {
        config.output.dir = output_dir;
    }

    info!("🔍 Checking ffmpeg installation...");
    let backend = FfmpegBackend::new(&config.poster.ffmpeg_path, &config.poster.ffprobe_path);
    if let Err(e) = backend.check_installed().await {
        bail!("ffmpeg is required: {}", e);
    }

    let mut pairs = scan_videos(&config.output.dir)?;
    if pairs.is_empty() {
        bail!("No videos found in {}", config.output.dir.display());
    }
    if cli.missing_only {
        pairs = missing_posters(pairs);
    }
    if pairs.is_empty() {
        info!("✅ Every video already has a poster");
        return Ok(());
    }

    let overwrites = pairs.iter().filter(|pair| pair.has_poster()).count();
    info!("📹 Found {} videos ({} posters will be overwritten)", pairs.len(), overwrites);

    if overwrites > 0 && !cli.yes {
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Regenerate {} posters?", pairs.len()))
            .default(false)
            .interact()?;
        if !proceed {
            info!("Cancelled, nothing changed");
            return Ok(());
        }
    }

    let shutdown = Shutdown::new();
    shutdown.listen_for_ctrl_c();

    let extractor = FrameExtractor::ffmpeg(&config.poster);
    let report = regenerate_posters(&extractor, &pairs, &shutdown).await;

    info!("{}", "=".repeat(60));
    info!("📊 Posters regenerated: {}/{}", report.succeeded, pairs.len());
    if report.interrupted {
        warn!("⚠️  Interrupted before all videos were processed");
    }
    if !report.failed.is_empty() {
        warn!("❌ Failed: {}", report.failed.len());
        for (id, error) in &report.failed {
            warn!("  - {}: {}", id, error);
        }
        std::process::exit(1);
    }

    Ok(())
}
