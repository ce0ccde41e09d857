//! Binarization feeding the edge localizer.
//!
//! The frame is thresholded against a Gaussian-weighted local mean (dark
//! features become foreground), opened with a 2x2 square to drop speckle,
//! and each detection patch is dilated with a 3x3 square before its edge is
//! searched.

use image::{GrayImage, ImageBuffer, Luma, RgbImage, imageops};
use imageproc::distance_transform::Norm;

use crate::detection::PixelBox;
use crate::edge::FOREGROUND;

/// Gaussian adaptive threshold, inverted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binarizer {
    block_size: u32,
    c: f32,
    sigma: f32,
}

impl Default for Binarizer {
    fn default() -> Self {
        Self::new(11, 2.0)
    }
}

impl Binarizer {
    /// `block_size` is forced odd and at least 3.
    pub fn new(block_size: u32, c: f32) -> Self {
        let block_size = (block_size.max(3)) | 1;
        // sigma that an unspecified-sigma Gaussian of this aperture gets
        #[allow(clippy::cast_precision_loss)]
        let sigma = 0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
        Self {
            block_size,
            c,
            sigma,
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    /// Threshold and open a color frame.
    pub fn binarize(&self, frame: &RgbImage) -> BinaryFrame {
        let gray = imageops::grayscale(frame);
        BinaryFrame(open_2x2(&self.threshold(&gray)))
    }

    /// Pixels brighter than their local mean minus `c` become 0, the rest 255.
    pub fn threshold(&self, gray: &GrayImage) -> GrayImage {
        let (w, h) = gray.dimensions();
        if w == 0 || h == 0 {
            return gray.clone();
        }
        let f: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_fn(w, h, |x, y| Luma([f32::from(gray.get_pixel(x, y)[0])]));
        let mean = imageproc::filter::gaussian_blur_f32(&f, self.sigma);
        GrayImage::from_fn(w, h, |x, y| {
            let v = f.get_pixel(x, y)[0];
            let t = mean.get_pixel(x, y)[0] - self.c;
            if v > t { Luma([0]) } else { Luma([FOREGROUND]) }
        })
    }
}

/// Offsets of a 2x2 kernel anchored at its bottom-right cell.
const KERNEL_2X2: [(u32, u32); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];

/// Min (`erode`) or max over the 2x2 window ending at each pixel.
/// Pixels outside the image are skipped.
fn window_2x2(img: &GrayImage, erode: bool) -> GrayImage {
    let (w, h) = img.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let mut v = if erode { u8::MAX } else { u8::MIN };
        for (dx, dy) in KERNEL_2X2 {
            if let (Some(sx), Some(sy)) = (x.checked_sub(dx), y.checked_sub(dy)) {
                let p = img.get_pixel(sx, sy)[0];
                v = if erode { v.min(p) } else { v.max(p) };
            }
        }
        Luma([v])
    })
}

/// Morphological opening with a 2x2 square.
///
/// Both passes use the same up-left window (anchor at the kernel's last
/// cell), so a surviving block moves one pixel right and down: rows `a..=b`
/// come out as `a+1..=b+1`. Recorded readings depend on that shift.
pub fn open_2x2(img: &GrayImage) -> GrayImage {
    window_2x2(&window_2x2(img, true), false)
}

/// A thresholded, opened frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryFrame(GrayImage);

impl BinaryFrame {
    /// Wrap an already binarized image.
    pub fn from_gray(img: GrayImage) -> Self {
        Self(img)
    }

    pub fn image(&self) -> &GrayImage {
        &self.0
    }

    pub fn into_inner(self) -> GrayImage {
        self.0
    }

    /// The patch under `bbox`, dilated with a 3x3 square.
    ///
    /// The box is clipped to the frame; an empty result is returned as a
    /// zero-sized image.
    pub fn patch(&self, bbox: &PixelBox) -> GrayImage {
        let (w, h) = self.0.dimensions();
        let x = bbox.x.min(w);
        let y = bbox.y.min(h);
        let pw = bbox.width.min(w - x);
        let ph = bbox.height.min(h - y);
        if pw == 0 || ph == 0 {
            return GrayImage::new(0, 0);
        }
        let crop = imageops::crop_imm(&self.0, x, y, pw, ph).to_image();
        imageproc::morphology::dilate(&crop, Norm::LInf, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_band_becomes_foreground() {
        let frame = RgbImage::from_fn(40, 40, |_, y| {
            if (18..22).contains(&y) {
                image::Rgb([10, 10, 10])
            } else {
                image::Rgb([220, 220, 220])
            }
        });
        let bin = Binarizer::default().binarize(&frame);
        assert_eq!(bin.image().get_pixel(20, 20)[0], FOREGROUND);
        assert_eq!(bin.image().get_pixel(20, 5)[0], 0);
    }

    #[test]
    fn uniform_frame_has_no_foreground() {
        // v > mean - c fails nowhere on a flat image, so nothing is foreground
        let frame = RgbImage::from_pixel(16, 16, image::Rgb([128, 128, 128]));
        let bin = Binarizer::default().binarize(&frame);
        assert!(bin.image().pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn opening_drops_single_pixels_and_keeps_blocks() {
        let mut img = GrayImage::new(10, 10);
        img.put_pixel(1, 1, Luma([255]));
        for y in 5..8 {
            for x in 5..8 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let out = open_2x2(&img);
        assert_eq!(out.get_pixel(1, 1)[0], 0);
        assert_eq!(out.get_pixel(2, 2)[0], 0);
        // the 5..=7 block survives shifted to 6..=8
        for y in 6..9 {
            for x in 6..9 {
                assert_eq!(out.get_pixel(x, y)[0], 255, "({x},{y})");
            }
        }
        assert_eq!(out.get_pixel(5, 5)[0], 0);
        assert_eq!(out.get_pixel(5, 7)[0], 0);
        assert_eq!(out.get_pixel(9, 8)[0], 0);
    }

    #[test]
    fn opened_band_moves_one_row_down() {
        // foreground rows 3..=6 over the full width
        let img = GrayImage::from_fn(6, 12, |_, y| {
            if (3..=6).contains(&y) { Luma([255]) } else { Luma([0]) }
        });
        let out = open_2x2(&img);
        let rows: Vec<u32> = (0..12).filter(|&y| out.get_pixel(3, y)[0] == 255).collect();
        assert_eq!(rows, vec![4, 5, 6, 7]);
        // the image edge does not erode the first column
        assert_eq!(out.get_pixel(0, 4)[0], 255);
    }

    #[test]
    fn patch_is_clipped_and_dilated() {
        let mut img = GrayImage::new(20, 20);
        img.put_pixel(10, 10, Luma([255]));
        let bin = BinaryFrame::from_gray(img);
        let p = bin.patch(&PixelBox {
            x: 8,
            y: 8,
            width: 100,
            height: 5,
        });
        assert_eq!(p.dimensions(), (12, 5));
        assert_eq!(p.get_pixel(1, 1)[0], 255);
        assert_eq!(p.get_pixel(3, 3)[0], 255);
        assert_eq!(p.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn block_size_is_odd() {
        assert_eq!(Binarizer::new(10, 2.0).block_size(), 11);
        assert!((Binarizer::default().sigma() - 2.0).abs() < 1e-6);
    }
}
