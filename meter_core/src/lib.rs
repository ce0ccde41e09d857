#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Meniscus level measurement (camera- and model-agnostic).
//!
//! Frames and detections come in through `meter_traits`; readings go out as
//! text lines through a `ReadingSink`.
//!
//! ## Pipeline
//!
//! - **Frame**: rotation and centered ROI crop (`frame`)
//! - **Detection**: confidence ranking and threshold (`detection`)
//! - **Edge**: binarized patch, multi-column lower-edge average (`preprocess`, `edge`)
//! - **Correction**: lens quadratic, then parallax about the mark midpoint (`correction`)
//! - **Volume**: linear scale between the two marks (`volume`)
//! - **Tracker**: top/bottom labeling of the two interfaces (`tracker`)
//!
//! All rows are rows of the rotated, uncropped frame.

pub mod correction;
pub mod detection;
pub mod edge;
pub mod error;
pub mod external_error;
pub mod frame;
pub mod marks;
pub mod meter;
pub mod mocks;
pub mod output;
pub mod overlay;
pub mod preprocess;
pub mod runner;
pub mod tracker;
pub mod volume;

mod conversions;

pub use correction::{Correction, GeometricCorrector, LensModel};
pub use detection::{ByRank, DetectionFilter, PixelBox};
pub use edge::{EdgeLocalizer, EmptyColumnPolicy};
pub use error::{BuildError, MeterError, Result};
pub use frame::{CanvasMapping, FramePreparer, PreparedFrame, Roi};
pub use marks::{CalibrationMark, MarkPair, MarkSlot, MarkStore, PlacedMark, TubeGeometry};
pub use meter::{FrameReport, LevelMeter, LevelMeterBuilder};
pub use output::{NullSink, TcpLineSink, format_line};
pub use runner::{MarkCommand, MarkHandle, RunSummary, Runner, RunnerCfg, Tick, TickOutcome};
pub use tracker::{DetectedInterface, InterfaceReadings, order_interfaces};
pub use volume::volume_at;
