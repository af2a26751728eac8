use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use musescan_core::{
    load_config, validate_config, Config, Downloader, FileCandidate, HttpConversionService,
    HttpDownloader, Stage, Workflow, WorkflowEvent,
};

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG_FILE: &str = "musescan.toml";

/// Command-line arguments for musescan
#[derive(Parser, Debug)]
#[command(name = "musescan")]
#[command(about = "Convert a sheet music scan into MIDI and audio")]
#[command(version)]
struct Args {
    /// Sheet music image or PDF to convert
    file: PathBuf,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the MIDI file is saved to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Base URL of the conversion service
    #[arg(long)]
    service_url: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = resolve_config(&args)?;
    info!("Conversion service: {}", config.conversion.upload_url());
    info!("Output directory: {:?}", config.download.output_dir);

    let service = HttpConversionService::new(config.conversion.clone())
        .context("Failed to create conversion service client")?;
    let downloader = Arc::new(HttpDownloader::new(&config.download));
    let shared_downloader: Arc<dyn Downloader> = downloader.clone();
    let workflow = Workflow::new(&config, Arc::new(service)).with_downloader(shared_downloader);
    let mut events = workflow.subscribe();

    let candidate = FileCandidate::from_path(&args.file)
        .await
        .with_context(|| format!("Failed to read {:?}", args.file))?;
    workflow
        .select_file(candidate)
        .await
        .context("File not accepted")?;
    workflow.convert().await.context("Failed to start conversion")?;

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(WorkflowEvent::Progress { percent, .. }) => info!("Converting... {}%", percent),
                Ok(WorkflowEvent::Settled { .. }) => break,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("Missed {} workflow events", skipped),
                Err(RecvError::Closed) => break,
            },
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl+C")?;
                workflow.cancel().await;
                bail!("Conversion cancelled");
            }
        }
    }

    let snapshot = workflow.snapshot().await;
    match snapshot.stage {
        Stage::Ready => {
            if let Some(output) = &snapshot.output {
                println!("{}", serde_json::to_string_pretty(output)?);
            }
            let download_name = snapshot
                .file
                .as_ref()
                .map(|f| f.download_name.as_str())
                .unwrap_or("converted.mid");
            let target = downloader.target_path(download_name);
            let previous = modified_at(&target);
            if !workflow.download().await {
                bail!("Service did not provide a downloadable file");
            }
            if !was_written(&target, previous) {
                bail!("MIDI file was not saved to {:?}", target);
            }
            info!("Saved MIDI to {:?}", target);
            Ok(())
        }
        Stage::Failed => bail!(
            "{}",
            snapshot
                .failure_message
                .unwrap_or_else(|| "Conversion failed".to_string())
        ),
        other => bail!("Conversion ended in unexpected stage {}", other),
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Whether `path` exists and changed since `previous` was observed.
fn was_written(path: &Path, previous: Option<SystemTime>) -> bool {
    match (modified_at(path), previous) {
        (Some(now), Some(before)) => now != before,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Loads the configuration and applies command-line overrides.
fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            info!("Loading configuration from {}", DEFAULT_CONFIG_FILE);
            load_config(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_FILE))?
        }
        None => Config::default(),
    };

    if let Some(url) = &args.service_url {
        config.conversion.service_url = url.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.download.output_dir = dir.clone();
    }

    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}
