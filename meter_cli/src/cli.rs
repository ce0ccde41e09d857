//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use meter_core::PlacedMark;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "level-meter", version, about = "Meniscus level meter")]
pub struct Cli {
    /// Config file; `.toml` is sectioned TOML, anything else the Key=Value format.
    /// Created with defaults when missing.
    #[arg(long, value_name = "FILE", default_value = "Level_Meter.cfg")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); defaults to logging.level or info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline over recorded frames and detections
    Replay {
        /// JSON lines: {"frame": "img.png", "detections": [{"bbox": [ymin,xmin,ymax,xmax], "score": 0.9}]}
        #[arg(long, value_name = "FILE")]
        manifest: PathBuf,
        /// Calibration marks CSV (strict header `pixel,capacity`, two rows)
        #[arg(long, value_name = "FILE", conflicts_with = "mark")]
        marks: Option<PathBuf>,
        /// Calibration mark as ROW=CAPACITY; give twice (min mark first)
        #[arg(long, value_name = "ROW=CAP", value_parser = parse_mark, action = ArgAction::Append)]
        mark: Vec<PlacedMark>,
        /// Do not send readings over TCP even if output is enabled
        #[arg(long, action = ArgAction::SetTrue)]
        no_output: bool,
        /// Write per-frame readings to this CSV
        #[arg(long, value_name = "FILE")]
        readings_csv: Option<PathBuf>,
        /// Write annotated frames (PNG) into this directory
        #[arg(long, value_name = "DIR")]
        annotate: Option<PathBuf>,
        /// Stop after this many frames
        #[arg(long, value_name = "N")]
        max_frames: Option<u64>,
        /// Override runner.frame_delay_ms (0 disables pacing)
        #[arg(long, value_name = "MS")]
        delay_ms: Option<u64>,
    },
    /// Convert raw lower-edge rows to volumes without any image
    Compute {
        /// Calibration mark as ROW=CAPACITY; give exactly twice (min mark first)
        #[arg(long, value_name = "ROW=CAP", value_parser = parse_mark, action = ArgAction::Append, required = true)]
        mark: Vec<PlacedMark>,
        /// Raw full-frame row of a detected edge; repeatable
        #[arg(long, value_name = "ROW", action = ArgAction::Append, required = true, allow_negative_numbers = true)]
        raw: Vec<i32>,
    },
    /// Write the default configuration to --config
    InitConfig {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Run the pipeline on a synthetic tube image
    SelfCheck,
}

/// Parse `ROW=CAPACITY`.
pub fn parse_mark(s: &str) -> Result<PlacedMark, String> {
    let (row, cap) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ROW=CAPACITY, got '{s}'"))?;
    let pixel = row
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid mark row '{row}': {e}"))?;
    let capacity = cap
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid mark capacity '{cap}': {e}"))?;
    if !capacity.is_finite() {
        return Err(format!("mark capacity must be finite, got '{cap}'"));
    }
    Ok(PlacedMark { pixel, capacity })
}
