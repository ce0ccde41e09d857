//! File-backed replay: frames and detections recorded in a JSONL manifest.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::{Result, WrapErr};
use image::RgbImage;
use meter_config::Config;
use meter_core::overlay::{self, OverlayStyle};
use meter_core::{
    LevelMeter, MarkPair, MarkStore, NullSink, PlacedMark, RunSummary, Runner,
    RunnerCfg, TcpLineSink, TickOutcome,
};
use meter_traits::{BoxError, Detector, FrameSource, RawDetection, ReadingSink};
use serde::{Deserialize, Serialize};

use crate::error_fmt::UsageError;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestDetection {
    pub bbox: [f32; 4],
    pub score: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    /// Image path, relative to the manifest.
    pub frame: PathBuf,
    /// Boxes normalized to the rotated, cropped frame the detector sees.
    #[serde(default)]
    pub detections: Vec<ManifestDetection>,
}

/// Parse a JSONL manifest; blank lines and `#` comments are skipped.
pub fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read manifest {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut entries = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut entry: ManifestEntry = serde_json::from_str(line)
            .wrap_err_with(|| format!("manifest line {}: invalid entry", i + 1))?;
        if entry.frame.is_relative() {
            entry.frame = base.join(&entry.frame);
        }
        entries.push(entry);
    }
    if entries.is_empty() {
        eyre::bail!("manifest {} has no frames", path.display());
    }
    Ok(entries)
}

/// Shared cursor so the detector answers for the frame last yielded.
#[derive(Debug, Clone)]
struct Cursor {
    entries: Rc<[ManifestEntry]>,
    current: Rc<Cell<Option<usize>>>,
}

pub struct ManifestFrames {
    cursor: Cursor,
    next: usize,
}

pub struct ManifestDetector {
    cursor: Cursor,
}

/// Frame source and detector replaying the same manifest in lockstep.
pub fn replay_pair(entries: Vec<ManifestEntry>) -> (ManifestFrames, ManifestDetector) {
    let cursor = Cursor {
        entries: entries.into(),
        current: Rc::new(Cell::new(None)),
    };
    (
        ManifestFrames {
            cursor: cursor.clone(),
            next: 0,
        },
        ManifestDetector { cursor },
    )
}

impl FrameSource for ManifestFrames {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, BoxError> {
        let Some(entry) = self.cursor.entries.get(self.next) else {
            return Ok(None);
        };
        let idx = self.next;
        self.next += 1;
        self.cursor.current.set(None);
        let img = image::ImageReader::open(&entry.frame)?
            .with_guessed_format()?
            .decode()?
            .to_rgb8();
        self.cursor.current.set(Some(idx));
        Ok(Some(img))
    }
}

impl Detector for ManifestDetector {
    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<RawDetection>, BoxError> {
        let idx = self
            .cursor
            .current
            .get()
            .ok_or("detector called without a current frame")?;
        let entry = self
            .cursor
            .entries
            .get(idx)
            .ok_or("manifest cursor out of range")?;
        Ok(entry
            .detections
            .iter()
            .map(|d| RawDetection::new(d.bbox, d.score))
            .collect())
    }
}

#[derive(Debug, Serialize)]
struct ReadingRow {
    frame: u64,
    raw_1: Option<i32>,
    score_1: Option<f32>,
    raw_2: Option<i32>,
    score_2: Option<f32>,
    top: Option<f64>,
    bottom: Option<f64>,
}

/// Where the starting marks come from.
pub enum MarkSource {
    None,
    Csv(PathBuf),
    Args(Vec<PlacedMark>),
}

/// Resolve and validate the starting marks.
pub fn initial_marks(src: &MarkSource) -> Result<MarkStore> {
    let (min, max) = match src {
        MarkSource::None => return Ok(MarkStore::new()),
        MarkSource::Csv(path) => {
            let [a, b] = meter_config::load_marks_csv(path)?;
            (PlacedMark::from(a), PlacedMark::from(b))
        }
        MarkSource::Args(marks) => match marks.as_slice() {
            [] => return Ok(MarkStore::new()),
            [a, b] => (*a, *b),
            _ => {
                return Err(UsageError(format!(
                    "--mark must be given exactly twice, got {}",
                    marks.len()
                ))
                .into());
            }
        },
    };
    MarkPair::new(min, max)?;
    Ok(MarkStore::with_marks(min, max))
}

pub struct ReplayOpts {
    pub manifest: PathBuf,
    pub marks: MarkSource,
    pub no_output: bool,
    pub readings_csv: Option<PathBuf>,
    pub annotate: Option<PathBuf>,
    pub max_frames: Option<u64>,
    pub delay_ms: Option<u64>,
}

fn sink_for(cfg: &Config, no_output: bool) -> Box<dyn ReadingSink> {
    if cfg.output.enabled && !no_output {
        let sink = TcpLineSink::new(
            cfg.output.host.clone(),
            cfg.output.port,
            Duration::from_millis(cfg.output.connect_timeout_ms),
        );
        tracing::info!(endpoint = %sink.endpoint(), "sending readings over TCP");
        Box::new(sink)
    } else {
        Box::new(NullSink)
    }
}

pub fn run_replay(
    cfg: &Config,
    opts: &ReplayOpts,
    json: bool,
    shutdown: &Arc<AtomicBool>,
) -> Result<RunSummary> {
    let marks = initial_marks(&opts.marks)?;
    let entries = load_manifest(&opts.manifest)?;
    tracing::info!(frames = entries.len(), manifest = %opts.manifest.display(), "replay start");

    let meter = LevelMeter::from_config(cfg)?;
    let mut runner_cfg = RunnerCfg::from(cfg);
    runner_cfg.max_frames = opts.max_frames;
    if let Some(ms) = opts.delay_ms {
        runner_cfg.frame_delay = Duration::from_millis(ms);
    }

    let mut csv_out = match &opts.readings_csv {
        Some(p) => Some(
            csv::Writer::from_path(p)
                .wrap_err_with(|| format!("failed to create {}", p.display()))?,
        ),
        None => None,
    };
    if let Some(dir) = &opts.annotate {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("failed to create {}", dir.display()))?;
    }
    let style = OverlayStyle {
        canvas_height: cfg.display.canvas_height,
        line_width: cfg.display.line_width,
    };

    let (frames, detector) = replay_pair(entries);
    let mut runner = Runner::new(frames, detector, sink_for(cfg, opts.no_output), meter, runner_cfg)
        .with_marks(marks);

    // Ctrl-C handler flips the same flag the runner polls
    let stop = runner.shutdown_flag();
    let outer = Arc::clone(shutdown);
    let mut io_error: Option<eyre::Report> = None;

    let summary = runner.run(|tick| {
        if outer.load(std::sync::atomic::Ordering::Relaxed) {
            stop.store(true, std::sync::atomic::Ordering::Relaxed);
        }
        if io_error.is_some() {
            return;
        }
        let TickOutcome::Reported {
            frame,
            report,
            line,
            ..
        } = tick.outcome
        else {
            return;
        };
        let first = report.interfaces.first;
        let second = report.interfaces.second;
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "frame": tick.index,
                    "top": report.readings.top,
                    "bottom": report.readings.bottom,
                    "raw": [first.map(|i| i.raw_position), second.map(|i| i.raw_position)],
                })
            );
        } else {
            println!("frame {}: {}", tick.index, line.trim_end());
        }
        if let Some(w) = csv_out.as_mut() {
            let row = ReadingRow {
                frame: tick.index,
                raw_1: first.map(|i| i.raw_position),
                score_1: first.map(|i| i.score),
                raw_2: second.map(|i| i.raw_position),
                score_2: second.map(|i| i.score),
                top: report.readings.top,
                bottom: report.readings.bottom,
            };
            if let Err(e) = w.serialize(row) {
                io_error = Some(eyre::Report::new(e).wrap_err("failed to write readings CSV"));
            }
        }
        if let Some(dir) = &opts.annotate {
            let img = overlay::render(frame, report, tick.marks, style);
            let path = dir.join(format!("frame_{:05}.png", tick.index));
            if let Err(e) = img.save(&path) {
                io_error = Some(
                    eyre::Report::new(e).wrap_err(format!("failed to write {}", path.display())),
                );
            }
        }
    });

    if let Some(w) = csv_out.as_mut() {
        w.flush().wrap_err("failed to flush readings CSV")?;
    }
    if let Some(e) = io_error {
        return Err(e);
    }
    Ok(summary)
}
