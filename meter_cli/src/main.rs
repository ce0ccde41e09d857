#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
//! `level-meter`: replay recorded frames through the meniscus pipeline,
//! compute volumes from raw rows, and manage the configuration file.

mod cli;
mod compute;
mod error_fmt;
mod replay;
mod self_check;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use meter_config::{Config, ConfigFormat, Loaded};
use meter_core::MeterError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::replay::{MarkSource, ReplayOpts};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error handler: {e}");
    }

    if let Err(err) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::InitConfig { force } = cli.cmd {
        init_tracing(cli.json, cli.log_level.as_deref(), &meter_config::Logging::default())?;
        return init_config(&cli.config, force, cli.json);
    }

    let loaded = load_config(&cli.config)?;
    init_tracing(cli.json, cli.log_level.as_deref(), &loaded.config.logging)?;
    if loaded.created {
        tracing::info!(path = %cli.config.display(), "created default config");
    }
    for key in &loaded.unknown_keys {
        tracing::warn!(key = %key, "unknown config key ignored");
    }
    let cfg = loaded.config;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    match cli.cmd {
        Commands::Replay {
            manifest,
            marks,
            mark,
            no_output,
            readings_csv,
            annotate,
            max_frames,
            delay_ms,
        } => {
            let marks = match (marks, mark.is_empty()) {
                (Some(p), _) => MarkSource::Csv(p),
                (None, false) => MarkSource::Args(mark),
                (None, true) => MarkSource::None,
            };
            let opts = ReplayOpts {
                manifest,
                marks,
                no_output,
                readings_csv,
                annotate,
                max_frames,
                delay_ms,
            };
            let summary = replay::run_replay(&cfg, &opts, cli.json, &shutdown)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "summary": {
                            "frames": summary.frames,
                            "reported": summary.reported,
                            "skipped": summary.skipped,
                            "sink_failures": summary.sink_failures,
                            "interrupted": summary.interrupted,
                        }
                    })
                );
            } else {
                println!(
                    "replay complete: {} frames, {} reported, {} skipped, {} undelivered",
                    summary.frames, summary.reported, summary.skipped, summary.sink_failures
                );
            }
            Ok(())
        }
        Commands::Compute { mark, raw } => {
            let rows = compute::compute(&cfg, &mark, &raw)?;
            compute::print_rows(&rows, cli.json)
        }
        Commands::SelfCheck => self_check::run(&cfg, cli.json),
        Commands::InitConfig { .. } => Ok(()),
    }
}

/// Load (or create) and validate. Logging is not initialized yet.
fn load_config(path: &Path) -> Result<Loaded> {
    let loaded =
        meter_config::load_or_create(path).map_err(|e| MeterError::Config(format!("{e:#}")))?;
    loaded
        .config
        .validate()
        .map_err(|e| MeterError::Config(format!("{}: {e:#}", path.display())))?;
    Ok(loaded)
}

fn init_config(path: &Path, force: bool, json: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(MeterError::Config(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        ))
        .into());
    }
    let format = ConfigFormat::for_path(path);
    let text = meter_config::render(&Config::default(), format)?;
    meter_config::write_atomic(path, text.as_bytes())
        .wrap_err_with(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), ?format, "default config written");
    if json {
        println!("{}", serde_json::json!({ "written": path.display().to_string() }));
    } else {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn init_tracing(json: bool, cli_level: Option<&str>, logging: &meter_config::Logging) -> Result<()> {
    let level = cli_level
        .or(logging.level.as_deref())
        .unwrap_or("info")
        .to_owned();
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    // console logs go to stderr so stdout carries only readings
    let console = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    let file = match &logging.file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let dir = dir.unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("level-meter.log");
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(EnvFilter::new(&level))
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("failed to init logging: {e}"))?;
    Ok(())
}
