//! Annotated preview of a measured frame.

use image::{Rgb, RgbImage, imageops};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::frame::{CanvasMapping, PreparedFrame};
use crate::marks::MarkStore;
use crate::meter::FrameReport;

pub const INTERFACE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const MARK_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const CENTER_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStyle {
    pub canvas_height: u32,
    pub line_width: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            canvas_height: 600,
            line_width: 1,
        }
    }
}

fn hline(img: &mut RgbImage, row: i32, width: u32, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    let Ok(h) = i32::try_from(h) else { return };
    let Ok(thick) = i32::try_from(width.max(1)) else { return };
    let top = row - thick / 2;
    if top + thick <= 0 || top >= h {
        return;
    }
    draw_filled_rect_mut(img, Rect::at(0, top).of_size(w, width.max(1)), color);
}

fn vline(img: &mut RgbImage, col: i32, width: u32, color: Rgb<u8>) {
    let h = img.height();
    let Ok(thick) = i32::try_from(width.max(1)) else { return };
    draw_filled_rect_mut(img, Rect::at(col - thick / 2, 0).of_size(width.max(1), h), color);
}

/// Scale the ROI to the canvas height and draw interfaces, marks and a center cross.
pub fn render(
    frame: &PreparedFrame,
    report: &FrameReport,
    marks: &MarkStore,
    style: OverlayStyle,
) -> RgbImage {
    let mapping = CanvasMapping::new(frame.roi, style.canvas_height);
    let (w, h) = mapping.scaled_size();
    let mut img = imageops::resize(&frame.image, w, h, imageops::FilterType::Triangle);

    for iface in report.interfaces.iter().flatten() {
        hline(
            &mut img,
            mapping.frame_to_canvas(iface.raw_position),
            style.line_width,
            INTERFACE_COLOR,
        );
    }
    for mark in marks.placed() {
        hline(
            &mut img,
            mapping.frame_to_canvas(mark.pixel),
            style.line_width,
            MARK_COLOR,
        );
    }

    let (cx, cy) = (w / 2, h / 2);
    if let (Ok(cx), Ok(cy)) = (i32::try_from(cx), i32::try_from(cy)) {
        vline(&mut img, cx, style.line_width, CENTER_COLOR);
        hline(&mut img, cy, style.line_width, CENTER_COLOR);
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::ByRank;
    use crate::frame::Roi;
    use crate::marks::PlacedMark;
    use crate::tracker::DetectedInterface;

    #[test]
    fn lines_land_on_scaled_rows() {
        let frame = PreparedFrame {
            image: RgbImage::from_pixel(100, 200, Rgb([255, 255, 255])),
            roi: Roi::full(100, 200),
            full_size: (100, 200),
        };
        let report = FrameReport {
            interfaces: ByRank::new(
                Some(DetectedInterface {
                    raw_position: 40,
                    score: 0.9,
                    corrected_position: None,
                    reading: None,
                }),
                None,
            ),
            ..FrameReport::default()
        };
        let marks = MarkStore::with_marks(
            PlacedMark {
                pixel: 160,
                capacity: 0.0,
            },
            PlacedMark {
                pixel: 20,
                capacity: 10.0,
            },
        );
        let img = render(
            &frame,
            &report,
            &marks,
            OverlayStyle {
                canvas_height: 100,
                line_width: 1,
            },
        );
        assert_eq!(img.dimensions(), (50, 100));
        assert_eq!(*img.get_pixel(5, 20), INTERFACE_COLOR);
        assert_eq!(*img.get_pixel(5, 80), MARK_COLOR);
        assert_eq!(*img.get_pixel(5, 10), MARK_COLOR);
        assert_eq!(*img.get_pixel(25, 5), CENTER_COLOR);
        // untouched rows keep the (resampled) white background
        assert!(img.get_pixel(5, 30).0.iter().all(|&c| c > 250));
    }
}
