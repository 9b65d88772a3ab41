//! Application entry point for the cloth viewer.
//!
//! This binary parses the command line, installs the logger and delegates
//! all interactive logic and rendering to [`ClothViewer`] from the `viewer`
//! module.

mod viewer;

use std::path::PathBuf;

use clap::Parser;
use cloth_core::Config;
use ftlog::{LevelFilter, LoggerGuard};

use viewer::ClothViewer;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON file with a full or partial simulation configuration.
    #[arg(short('c'), long)]
    config: Option<PathBuf>,

    /// Particles along each side of the sheet (overrides the config file).
    #[arg(short('n'), long)]
    size: Option<usize>,

    /// Side length of the sheet (overrides the config file).
    #[arg(short('e'), long)]
    extent: Option<f32>,

    /// Springs per parallel force task; 0 keeps force accumulation serial.
    #[arg(short('p'), long)]
    parallel: Option<usize>,

    /// Cap on substeps per frame; unbounded when omitted or 0.
    #[arg(short('m'), long)]
    max_substeps: Option<u32>,

    /// Seed for the "Shake" button.
    #[arg(short('s'), long, default_value_t = 0)]
    seed: u64,
}

/// Installs an stderr logger at `Info` level.
///
/// ### Returns
/// The guard that flushes pending records when dropped; keep it alive for
/// the whole process.
fn configure_logger() -> Result<LoggerGuard, String> {
    ftlog::Builder::new()
        .max_log_level(LevelFilter::Info)
        .try_init()
        .map_err(|e| e.to_string())
}

/// Builds the starting configuration from the optional JSON file and the
/// command-line overrides.
fn load_config(args: &Args) -> Result<Config, String> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("reading {}: {e}", path.display()))?;
            serde_json::from_str(&text).map_err(|e| format!("parsing {}: {e}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(size) = args.size {
        cfg = cfg.with_size(size);
    }
    if let Some(extent) = args.extent {
        cfg = cfg.with_extent(extent);
    }
    if let Some(chunk_len) = args.parallel {
        cfg = cfg.with_parallel_chunk_len(chunk_len);
    }
    if let Some(max) = args.max_substeps {
        cfg = cfg.with_max_substeps_per_frame(max);
    }
    Ok(cfg)
}

/// Starts the native eframe application.
///
/// ### Returns
/// - `Ok(())` if the application runs to completion without errors.
/// - `Err` if the configuration is invalid or eframe fails to create the
///   native window or event loop.
fn main() -> Result<(), String> {
    let args = Args::parse();
    let _guard = configure_logger()?;

    let cfg = load_config(&args)?;
    ftlog::info!("Starting viewer with {cfg:?}");
    let viewer = ClothViewer::new(cfg, args.seed).map_err(|e| e.to_string())?;

    eframe::run_native(
        "Cloth",
        eframe::NativeOptions::default(),
        Box::new(|_cc| Ok(Box::new(viewer))),
    )
    .map_err(|e| e.to_string())
}
