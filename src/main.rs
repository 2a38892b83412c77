use anyhow::{Context, Result};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

mod config;
mod error;
mod media;
mod queue;
mod utils;

use config::Config;
use media::{search::read_search_terms, YtDlpExtractor};
use queue::{
    failure_file_layer, ControllerSettings, DownloadController, DownloadOutcome,
    TracingFailureLog, TracingProgress, FAILURE_TARGET,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory downloads are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Maximum concurrent extractor processes
    #[arg(short, long)]
    workers: Option<usize>,

    /// Browser to borrow session cookies from (chrome, firefox, ...)
    #[arg(short, long)]
    browser: Option<String>,

    /// Path to the ffmpeg binary
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Fail instead of warning when ffmpeg is missing
    #[arg(long)]
    require_ffmpeg: bool,

    /// Accept URLs from any host
    #[arg(long)]
    any_host: bool,

    /// Semicolon separated file of artist;title rows to search for
    #[arg(long = "csv", value_name = "FILE")]
    csv: Vec<PathBuf>,

    /// Append failed downloads to this file
    #[arg(long, value_name = "FILE")]
    failure_log: Option<PathBuf>,

    /// Video or playlist URLs
    urls: Vec<String>,
}

fn get_config_path(args: &Args) -> Option<PathBuf> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }

    if let Ok(path) = std::env::var("CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }

    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        let config_path = PathBuf::from(xdg_config_home)
            .join("vidqueue")
            .join("config.toml");
        if config_path.exists() {
            return Some(config_path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let config_path = home.join(".config").join("vidqueue").join("config.toml");
        if config_path.exists() {
            return Some(config_path);
        }
    }

    None
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(workers) = args.workers {
        config.max_workers = workers;
    }
    if let Some(browser) = &args.browser {
        config.browser = Some(browser.clone());
    }
    if let Some(ffmpeg) = &args.ffmpeg {
        config.ffmpeg_path = Some(ffmpeg.clone());
    }
    if args.require_ffmpeg {
        config.require_ffmpeg = true;
    }
    if args.any_host {
        config.restrict_platform = false;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match get_config_path(&args) {
        Some(config_path) => Config::from_file(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?,
        None => Config::default(),
    };
    apply_overrides(&mut config, &args);

    // Failure records go to the failure log only, the console already gets
    // the error event.
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        .add_directive(format!("{FAILURE_TARGET}=off").parse()?);

    let console = if config.get_logging_format() == "json" {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let (failure_layer, _failure_guard) = match &args.failure_log {
        Some(path) => {
            let (layer, guard) = failure_file_layer::<Registry>(path)?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(failure_layer)
        .with(console.with_filter(env_filter))
        .init();

    info!("Starting vidqueue...");

    if args.urls.is_empty() && args.csv.is_empty() {
        anyhow::bail!("Nothing to download: pass one or more URLs or --csv FILE");
    }

    let mut search_terms = Vec::new();
    for path in &args.csv {
        search_terms.extend(read_search_terms(path)?);
    }

    let extractor = YtDlpExtractor::new();
    if !extractor.test_availability().await {
        warn!("yt-dlp is not available, every download will fail");
    }

    let settings = ControllerSettings::resolve(&config).await?;
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let mut builder = DownloadController::builder(settings, Arc::new(extractor))
        .progress(Arc::new(TracingProgress))
        .outcomes(tx);
    if args.failure_log.is_some() {
        builder = builder.failure_log(Arc::new(TracingFailureLog));
    }
    let controller = builder.build()?;

    for rejected in controller.enqueue(&args.urls).await {
        warn!("Skipping {}: {}", rejected.input, rejected.reason);
    }
    controller.enqueue_search(&search_terms).await;
    controller.wait_idle().await;

    let mut failed = 0;
    while let Ok((target, outcome)) = rx.try_recv() {
        if outcome.is_failure() {
            failed += 1;
        }
        match outcome {
            DownloadOutcome::Completed(path) => println!("Downloaded: {}", path.display()),
            DownloadOutcome::Skipped { reason } => println!("Skipped {target}: {reason}"),
            DownloadOutcome::Failed { reason } => println!("Failed {target}: {reason}"),
        }
    }

    if failed > 0 {
        anyhow::bail!(
            "{} download(s) failed, output in {}",
            failed,
            controller.settings().output_dir.display()
        );
    }

    Ok(())
}
