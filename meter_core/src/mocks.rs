//! Collaborator stand-ins for tests, benches and the self-check.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};
use meter_traits::{BoxError, Detector, FrameSource, RawDetection, ReadingSink};

pub const BACKGROUND: Rgb<u8> = Rgb([220, 220, 220]);
pub const MENISCUS: Rgb<u8> = Rgb([20, 20, 20]);
/// Rows of dark band drawn above each level.
pub const BAND_ROWS: u32 = 6;

/// A light tube image with one dark meniscus band ending at each of `levels`.
///
/// Bands cover the middle 60% of the width. After binarization and patch
/// dilation the localized edge lands two rows below the level.
pub fn synthetic_tube(width: u32, height: u32, levels: &[u32]) -> RgbImage {
    let x0 = width / 5;
    let x1 = width - width / 5;
    RgbImage::from_fn(width, height, |x, y| {
        let in_band = levels
            .iter()
            .any(|&l| y <= l && y + BAND_ROWS > l);
        if in_band && (x0..x1).contains(&x) {
            MENISCUS
        } else {
            BACKGROUND
        }
    })
}

/// Normalized box spanning `row` +- 15 rows over the middle 40% of the width.
#[allow(clippy::cast_precision_loss)]
pub fn detection_for_row(row: u32, height: u32, score: f32) -> RawDetection {
    let h = height.max(1) as f32;
    let ymin = row.saturating_sub(15) as f32 / h;
    let ymax = (row + 15).min(height) as f32 / h;
    RawDetection::new([ymin, 0.3, ymax, 0.7], score)
}

/// Yields the given frames in order, then end of stream.
#[derive(Debug, Default)]
pub struct VecFrameSource {
    frames: VecDeque<Result<RgbImage, String>>,
}

impl VecFrameSource {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().map(Ok).collect(),
        }
    }

    /// Queue a read failure.
    pub fn push_error(&mut self, msg: impl Into<String>) {
        self.frames.push_back(Err(msg.into()));
    }

    pub fn push(&mut self, frame: RgbImage) {
        self.frames.push_back(Ok(frame));
    }
}

impl FrameSource for VecFrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, BoxError> {
        match self.frames.pop_front() {
            Some(Ok(f)) => Ok(Some(f)),
            Some(Err(msg)) => Err(msg.into()),
            None => Ok(None),
        }
    }
}

/// Returns scripted detections per call; repeats the last entry when exhausted.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    script: VecDeque<Result<Vec<RawDetection>, String>>,
    last: Vec<RawDetection>,
}

impl ScriptedDetector {
    pub fn new(script: impl IntoIterator<Item = Vec<RawDetection>>) -> Self {
        Self {
            script: script.into_iter().map(Ok).collect(),
            last: Vec::new(),
        }
    }

    /// Always the same detections.
    pub fn constant(detections: Vec<RawDetection>) -> Self {
        Self {
            script: VecDeque::new(),
            last: detections,
        }
    }

    pub fn push_error(&mut self, msg: impl Into<String>) {
        self.script.push_back(Err(msg.into()));
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<RawDetection>, BoxError> {
        match self.script.pop_front() {
            Some(Ok(d)) => {
                self.last.clone_from(&d);
                Ok(d)
            }
            Some(Err(msg)) => Err(msg.into()),
            None => Ok(self.last.clone()),
        }
    }
}

/// Records every line; clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ReadingSink for MemorySink {
    fn send(&mut self, line: &str) -> Result<(), BoxError> {
        self.lines
            .lock()
            .map_err(|_| "memory sink poisoned")?
            .push(line.to_owned());
        Ok(())
    }
}

/// Fails every send, like an acquisition peer that is not listening.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSink;

impl ReadingSink for FailingSink {
    fn send(&mut self, _line: &str) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }
}
