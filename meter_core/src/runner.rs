//! Frame loop: source -> prepare -> detector -> meter -> sink, once per tick.
//!
//! Mark edits arrive as `MarkCommand`s over a channel and are applied at the
//! start of a tick, so the loop is the only writer of the mark store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use meter_traits::{Clock, Detector, FrameSource, MonotonicClock, ReadingSink};

use crate::error::MeterError;
use crate::external_error::{Boundary, map_external_error};
use crate::frame::{CanvasMapping, PreparedFrame, Roi};
use crate::marks::{MarkSlot, MarkStore, PlacedMark};
use crate::meter::{FrameReport, LevelMeter};
use crate::output::{DEFAULT_ABSENT_TEXT, format_line};

/// A change to the calibration marks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkCommand {
    /// Click at a full-frame row.
    Click(i32),
    /// Click at a display canvas row; mapped through the current ROI.
    CanvasClick(i32),
    SetCapacity(MarkSlot, f64),
    /// Move an already placed mark.
    SetPixel(MarkSlot, i32),
    /// Place both marks at once.
    Replace(PlacedMark, PlacedMark),
    Clear,
}

/// Cloneable sender for mark edits.
#[derive(Debug, Clone)]
pub struct MarkHandle {
    tx: xch::Sender<MarkCommand>,
}

impl MarkHandle {
    /// Queue a command. Returns false once the runner is gone.
    pub fn send(&self, cmd: MarkCommand) -> bool {
        self.tx.send(cmd).is_ok()
    }

    pub fn click(&self, y: i32) -> bool {
        self.send(MarkCommand::Click(y))
    }

    pub fn canvas_click(&self, y: i32) -> bool {
        self.send(MarkCommand::CanvasClick(y))
    }

    pub fn set_capacity(&self, slot: MarkSlot, capacity: f64) -> bool {
        self.send(MarkCommand::SetCapacity(slot, capacity))
    }

    pub fn set_pixel(&self, slot: MarkSlot, pixel: i32) -> bool {
        self.send(MarkCommand::SetPixel(slot, pixel))
    }

    pub fn clear(&self) -> bool {
        self.send(MarkCommand::Clear)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerCfg {
    /// Pause after every tick; zero disables pacing.
    pub frame_delay: Duration,
    pub absent_text: String,
    /// Canvas height used to map `CanvasClick` rows.
    pub canvas_height: u32,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            frame_delay: Duration::from_millis(100),
            absent_text: DEFAULT_ABSENT_TEXT.to_owned(),
            canvas_height: 600,
            max_frames: None,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Readings computed and handed to the sink.
    Reported {
        frame: PreparedFrame,
        report: FrameReport,
        line: String,
        delivered: bool,
    },
    /// Frame or detector failure; nothing emitted.
    Skipped(MeterError),
    /// Marks coincide; nothing emitted until they change.
    Degenerate(i32),
    /// The source has no more frames.
    EndOfStream,
}

/// Observer view of a finished tick.
#[derive(Debug)]
pub struct Tick<'a> {
    pub index: u64,
    pub outcome: &'a TickOutcome,
    pub marks: &'a MarkStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub frames: u64,
    pub reported: u64,
    pub skipped: u64,
    pub degenerate: u64,
    pub sink_failures: u64,
    pub interrupted: bool,
}

pub struct Runner<F, D, K, C = MonotonicClock> {
    source: F,
    detector: D,
    sink: K,
    meter: LevelMeter,
    marks: MarkStore,
    cfg: RunnerCfg,
    clock: C,
    tx: xch::Sender<MarkCommand>,
    rx: xch::Receiver<MarkCommand>,
    shutdown: Arc<AtomicBool>,
    degenerate_logged: bool,
    last_roi: Option<Roi>,
}

impl<F, D, K> Runner<F, D, K, MonotonicClock>
where
    F: FrameSource,
    D: Detector,
    K: ReadingSink,
{
    pub fn new(source: F, detector: D, sink: K, meter: LevelMeter, cfg: RunnerCfg) -> Self {
        Self::with_clock(source, detector, sink, meter, cfg, MonotonicClock::new())
    }
}

impl<F, D, K, C> Runner<F, D, K, C>
where
    F: FrameSource,
    D: Detector,
    K: ReadingSink,
    C: Clock,
{
    pub fn with_clock(
        source: F,
        detector: D,
        sink: K,
        meter: LevelMeter,
        cfg: RunnerCfg,
        clock: C,
    ) -> Self {
        let (tx, rx) = xch::unbounded();
        Self {
            source,
            detector,
            sink,
            meter,
            marks: MarkStore::new(),
            cfg,
            clock,
            tx,
            rx,
            shutdown: Arc::new(AtomicBool::new(false)),
            degenerate_logged: false,
            last_roi: None,
        }
    }

    /// Start with `marks` instead of an empty store.
    pub fn with_marks(mut self, marks: MarkStore) -> Self {
        self.marks = marks;
        self
    }

    pub fn mark_handle(&self) -> MarkHandle {
        MarkHandle {
            tx: self.tx.clone(),
        }
    }

    /// Setting the flag stops `run` before its next tick.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn marks(&self) -> &MarkStore {
        &self.marks
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Apply queued mark commands. Returns how many were applied.
    pub fn drain_commands(&mut self) -> usize {
        let pending: Vec<MarkCommand> = self.rx.try_iter().collect();
        let n = pending.len();
        for cmd in pending {
            self.apply(cmd);
        }
        if n > 0 {
            self.degenerate_logged = false;
        }
        n
    }

    fn apply(&mut self, cmd: MarkCommand) {
        match cmd {
            MarkCommand::Click(y) => {
                let slot = self.marks.click(y);
                tracing::info!(?slot, row = y, "mark placed");
            }
            MarkCommand::CanvasClick(cy) => match self.last_roi {
                Some(roi) => {
                    let y = CanvasMapping::new(roi, self.cfg.canvas_height).canvas_to_frame(cy);
                    let slot = self.marks.click(y);
                    tracing::info!(?slot, row = y, canvas_row = cy, "mark placed");
                }
                None => tracing::warn!(canvas_row = cy, "canvas click before first frame ignored"),
            },
            MarkCommand::SetCapacity(slot, capacity) => {
                self.marks.set_capacity(slot, capacity);
                tracing::info!(?slot, capacity, "mark capacity set");
            }
            MarkCommand::SetPixel(slot, pixel) => {
                if self.marks.set_pixel(slot, pixel) {
                    tracing::info!(?slot, row = pixel, "mark moved");
                } else {
                    tracing::debug!(?slot, "mark not placed; pixel edit ignored");
                }
            }
            MarkCommand::Replace(min, max) => {
                self.marks = MarkStore::with_marks(min, max);
                tracing::info!(min = min.pixel, max = max.pixel, "marks replaced");
            }
            MarkCommand::Clear => {
                self.marks.clear();
                tracing::info!("marks cleared");
            }
        }
    }

    /// One pass of the loop, without pacing.
    pub fn tick(&mut self) -> TickOutcome {
        self.drain_commands();

        let raw = match self.source.next_frame() {
            Ok(Some(f)) => f,
            Ok(None) => return TickOutcome::EndOfStream,
            Err(e) => {
                let err = map_external_error(Boundary::Frame, &*e);
                tracing::warn!(error = %err, "frame read failed; skipping tick");
                return TickOutcome::Skipped(err);
            }
        };
        let frame = self.meter.prepare(&raw);
        self.last_roi = Some(frame.roi);

        let detections = match self.detector.detect(&frame.image) {
            Ok(d) => d,
            Err(e) => {
                let err = map_external_error(Boundary::Detector, &*e);
                tracing::warn!(error = %err, "detector failed; skipping tick");
                return TickOutcome::Skipped(err);
            }
        };

        let pair = match self.marks.pair() {
            Ok(p) => p,
            Err(MeterError::DegenerateCalibration(px)) => {
                if !self.degenerate_logged {
                    tracing::error!(row = px, "both marks on the same row; readings suspended");
                    self.degenerate_logged = true;
                }
                return TickOutcome::Degenerate(px);
            }
            Err(e) => return TickOutcome::Skipped(e),
        };

        let report = self.meter.measure(&frame, &detections, pair.as_ref());
        let line = format_line(&report.readings, &self.cfg.absent_text);
        let delivered = match self.sink.send(&line) {
            Ok(()) => true,
            Err(e) => {
                let err = map_external_error(Boundary::Output, &*e);
                tracing::warn!(error = %err, "reading not delivered");
                false
            }
        };
        TickOutcome::Reported {
            frame,
            report,
            line,
            delivered,
        }
    }

    /// Tick until the source ends, `max_frames` is reached or the shutdown
    /// flag is set. `observe` sees every tick.
    pub fn run(&mut self, mut observe: impl FnMut(&Tick<'_>)) -> RunSummary {
        let mut summary = RunSummary::default();
        let delay_ms = u64::try_from(self.cfg.frame_delay.as_millis()).unwrap_or(u64::MAX);
        tracing::info!(delay_ms, "meter loop start");
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                summary.interrupted = true;
                break;
            }
            if self.cfg.max_frames.is_some_and(|m| summary.frames >= m) {
                break;
            }

            let outcome = self.tick();
            match &outcome {
                TickOutcome::EndOfStream => break,
                TickOutcome::Reported { delivered, .. } => {
                    summary.reported += 1;
                    if !delivered {
                        summary.sink_failures += 1;
                    }
                }
                TickOutcome::Skipped(_) => summary.skipped += 1,
                TickOutcome::Degenerate(_) => summary.degenerate += 1,
            }
            summary.frames += 1;
            observe(&Tick {
                index: summary.frames - 1,
                outcome: &outcome,
                marks: &self.marks,
            });

            if self.shutdown.load(Ordering::Relaxed) {
                summary.interrupted = true;
                break;
            }
            self.clock.sleep(self.cfg.frame_delay);
        }
        tracing::info!(
            frames = summary.frames,
            reported = summary.reported,
            skipped = summary.skipped,
            sink_failures = summary.sink_failures,
            interrupted = summary.interrupted,
            "meter loop end"
        );
        summary
    }
}
