use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use effect_assets::assets::AssetPair;
use effect_assets::{catalog, BatchRunner, Config, Shutdown};

/// Generate preview videos and posters for the video-effects catalog
#[derive(Parser)]
#[command(name = "effect-assets")]
#[command(version, author = "TigreRoll")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for videos and posters
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Only process these effect ids (repeatable)
    #[arg(short, long = "effect", value_name = "ID")]
    effects: Vec<String>,

    /// Regenerate assets even when both files exist
    #[arg(long)]
    force: bool,

    /// List the catalog with asset status and exit
    #[arg(long)]
    list: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "effect_assets=debug,info"
    } else {
        "effect_assets=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_target(verbose)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(output_dir) = cli.output_dir {
        config.output.dir = output_dir;
    }
    if cli.force {
        config.batch.skip_existing = false;
    }

    let effects = catalog::select(&cli.effects)?;

    if cli.list {
        for effect in &effects {
            let pair = AssetPair::new(&config.output.dir, effect.id);
            println!(
                "{:<22} {:<22} {}",
                effect.id,
                effect.name,
                pair.status().status_string()
            );
        }
        return Ok(());
    }

    config.validate().context("Invalid configuration")?;

    info!("{}", "=".repeat(60));
    info!("🎬 Pixverse V5 effect asset generator");
    info!("{}", "=".repeat(60));
    info!("{}", config.summary());

    let runner = BatchRunner::from_config(&config)?;
    let shutdown = Shutdown::new();
    shutdown.listen_for_ctrl_c();

    let report = runner.run(&effects, &shutdown).await?;
    report.log_summary(runner.output_dir());

    if report.failed > 0 {
        error!("⚠️  {} effects failed. Check logs for details.", report.failed);
        std::process::exit(1);
    }

    Ok(())
}
