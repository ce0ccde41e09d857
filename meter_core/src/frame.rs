//! Frame orientation, region of interest and canvas mapping.
//!
//! Every row the pipeline reports is a row of the rotated, uncropped frame.
//! The ROI offset is added back wherever a crop-relative row is produced.

use image::{RgbImage, imageops};

/// Centered crop of the rotated frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    /// Keep `percent_x`/`percent_y` percent of a `width` x `height` frame,
    /// centered. Percentages are clamped to `1..=100` and the ROI is never
    /// smaller than one pixel.
    pub fn centered(width: u32, height: u32, percent_x: u32, percent_y: u32) -> Self {
        let keep = |extent: u32, percent: u32| -> u32 {
            let p = u64::from(percent.clamp(1, 100));
            let kept = u64::from(extent) * p / 100;
            u32::try_from(kept).unwrap_or(extent).clamp(1, extent.max(1))
        };
        let kw = keep(width, percent_x);
        let kh = keep(height, percent_y);
        Self {
            x: width.saturating_sub(kw) / 2,
            y: height.saturating_sub(kh) / 2,
            width: kw,
            height: kh,
        }
    }

    /// The whole frame.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Rotates and crops frames before detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePreparer {
    pub rotate_cw: bool,
    pub percent_x: u32,
    pub percent_y: u32,
}

impl Default for FramePreparer {
    fn default() -> Self {
        Self {
            rotate_cw: true,
            percent_x: 100,
            percent_y: 100,
        }
    }
}

/// A cropped frame plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedFrame {
    pub image: RgbImage,
    pub roi: Roi,
    /// Dimensions of the rotated, uncropped frame.
    pub full_size: (u32, u32),
}

impl FramePreparer {
    pub fn prepare(&self, frame: &RgbImage) -> PreparedFrame {
        let rotated;
        let oriented = if self.rotate_cw {
            rotated = imageops::rotate90(frame);
            &rotated
        } else {
            frame
        };
        let (w, h) = oriented.dimensions();
        let roi = Roi::centered(w, h, self.percent_x, self.percent_y);
        let image = if roi == Roi::full(w, h) {
            oriented.clone()
        } else {
            imageops::crop_imm(oriented, roi.x, roi.y, roi.width, roi.height).to_image()
        };
        PreparedFrame {
            image,
            roi,
            full_size: (w, h),
        }
    }
}

/// Relates display canvas rows to frame rows.
///
/// The ROI is scaled to the canvas height keeping its aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasMapping {
    roi: Roi,
    canvas_height: u32,
}

impl CanvasMapping {
    pub fn new(roi: Roi, canvas_height: u32) -> Self {
        Self {
            roi,
            canvas_height: canvas_height.max(1),
        }
    }

    /// Scaled image size on the canvas.
    pub fn scaled_size(&self) -> (u32, u32) {
        let w = u64::from(self.roi.width) * u64::from(self.canvas_height)
            / u64::from(self.roi.height.max(1));
        (
            u32::try_from(w).unwrap_or(u32::MAX).max(1),
            self.canvas_height,
        )
    }

    /// Frame row under canvas row `click_y`.
    pub fn canvas_to_frame(&self, click_y: i32) -> i32 {
        let scaled = i64::from(click_y) * i64::from(self.roi.height) / i64::from(self.canvas_height);
        clamp_i32(i64::from(self.roi.y) + scaled)
    }

    /// Canvas row showing frame row `y`.
    pub fn frame_to_canvas(&self, y: i32) -> i32 {
        let rel = i64::from(y) - i64::from(self.roi.y);
        clamp_i32(rel * i64::from(self.canvas_height) / i64::from(self.roi.height.max(1)))
    }
}

fn clamp_i32(v: i64) -> i32 {
    i32::try_from(v).unwrap_or(if v < 0 { i32::MIN } else { i32::MAX })
}
