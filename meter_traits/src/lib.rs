//! Collaborator seams for the level meter.
//!
//! The measurement core never talks to a camera, a model or a socket directly.
//! Everything outside the geometry and volume math reaches it through these traits.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use image::RgbImage;

/// Error type used at every trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One candidate box reported by the object detector.
///
/// `bbox` is `[ymin, xmin, ymax, xmax]`, normalized to `0.0..=1.0` of the image
/// the detector was given.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub bbox: [f32; 4],
    pub score: f32,
}

impl RawDetection {
    pub fn new(bbox: [f32; 4], score: f32) -> Self {
        Self { bbox, score }
    }
}

/// Source of camera frames. `Ok(None)` signals the end of the stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, BoxError>;
}

/// Meniscus detector. Results are expected ordered by descending score.
pub trait Detector {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<RawDetection>, BoxError>;
}

/// Consumer of formatted reading lines (one line per processed frame).
pub trait ReadingSink {
    fn send(&mut self, line: &str) -> Result<(), BoxError>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, BoxError> {
        (**self).next_frame()
    }
}

impl<T: Detector + ?Sized> Detector for Box<T> {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<RawDetection>, BoxError> {
        (**self).detect(frame)
    }
}

impl<T: ReadingSink + ?Sized> ReadingSink for Box<T> {
    fn send(&mut self, line: &str) -> Result<(), BoxError> {
        (**self).send(line)
    }
}
