//! Detector output selection and bounding-box mapping.

use meter_traits::RawDetection;

/// Two slots keyed by detector confidence rank (best first).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ByRank<T> {
    pub first: T,
    pub second: T,
}

impl<T> ByRank<T> {
    pub fn new(first: T, second: T) -> Self {
        Self { first, second }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> ByRank<U> {
        ByRank {
            first: f(self.first),
            second: f(self.second),
        }
    }

    pub fn as_ref(&self) -> ByRank<&T> {
        ByRank {
            first: &self.first,
            second: &self.second,
        }
    }

    /// Slots in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        [&self.first, &self.second].into_iter()
    }
}

/// Axis-aligned box in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Truncating scale of a normalized coordinate onto `0..=extent`.
#[inline]
fn scale_coord(v: f32, extent: u32) -> u32 {
    let v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
    // product is within 0..=extent, so the cast cannot wrap
    (f64::from(v) * f64::from(extent)).trunc() as u32
}

/// Map a normalized `[ymin, xmin, ymax, xmax]` box onto a `width` x `height` image.
///
/// Coordinates are clamped into the image and truncated like the detector's
/// reference tooling does. Degenerate (zero-area) boxes yield `None`.
pub fn to_pixel_box(det: &RawDetection, width: u32, height: u32) -> Option<PixelBox> {
    let [ymin, xmin, ymax, xmax] = det.bbox;
    let (y0, y1) = (scale_coord(ymin, height), scale_coord(ymax, height));
    let (x0, x1) = (scale_coord(xmin, width), scale_coord(xmax, width));
    if y1 <= y0 || x1 <= x0 {
        return None;
    }
    Some(PixelBox {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

/// Keeps the best `max_detections` candidates scoring strictly above `threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionFilter {
    threshold: f32,
    max_detections: usize,
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            max_detections: 2,
        }
    }
}

impl DetectionFilter {
    /// `max_detections` is clamped to `1..=2`.
    pub fn new(threshold: f32, max_detections: usize) -> Self {
        Self {
            threshold,
            max_detections: max_detections.clamp(1, 2),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Rank-slot the candidates.
    ///
    /// Candidates are ordered by descending score (stable, so an already sorted
    /// list is untouched), truncated to `max_detections`, then thresholded. A
    /// slot whose candidate fails the threshold stays empty. Candidates with a
    /// non-finite score are dropped before ranking.
    pub fn select(&self, detections: &[RawDetection]) -> ByRank<Option<RawDetection>> {
        let mut ranked: Vec<&RawDetection> =
            detections.iter().filter(|d| d.score.is_finite()).collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        let mut slots = ranked
            .into_iter()
            .take(self.max_detections)
            .map(|d| (d.score > self.threshold).then_some(*d));
        let first = slots.next().flatten();
        let second = slots.next().flatten();
        ByRank { first, second }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(score: f32) -> RawDetection {
        RawDetection::new([0.1, 0.1, 0.2, 0.2], score)
    }

    #[test]
    fn below_threshold_is_dropped() {
        let f = DetectionFilter::default();
        let sel = f.select(&[det(0.15)]);
        assert_eq!(sel, ByRank::new(None, None));
    }

    #[test]
    fn nan_scores_do_not_take_a_slot() {
        let f = DetectionFilter::default();
        let sel = f.select(&[det(f32::NAN), det(0.9), det(f32::INFINITY), det(0.6)]);
        assert_eq!(sel.first.map(|d| d.score), Some(0.9));
        assert_eq!(sel.second.map(|d| d.score), Some(0.6));
    }

    #[test]
    fn threshold_is_strict() {
        let f = DetectionFilter::new(0.5, 2);
        assert_eq!(f.select(&[det(0.5)]).first, None);
    }

    #[test]
    fn keeps_two_best_in_rank_order() {
        let f = DetectionFilter::default();
        let sel = f.select(&[det(0.4), det(0.9), det(0.7)]);
        assert_eq!(sel.first.map(|d| d.score), Some(0.9));
        assert_eq!(sel.second.map(|d| d.score), Some(0.7));
    }

    #[test]
    fn single_slot_mode() {
        let f = DetectionFilter::new(0.2, 1);
        let sel = f.select(&[det(0.9), det(0.8)]);
        assert!(sel.first.is_some());
        assert!(sel.second.is_none());
    }

    #[test]
    fn nan_scores_never_pass() {
        let f = DetectionFilter::new(0.0, 2);
        let sel = f.select(&[det(f32::NAN)]);
        assert_eq!(sel.first, None);
    }

    #[test]
    fn pixel_box_truncates_and_clamps() {
        let d = RawDetection::new([0.25, 0.1, 0.5, 1.2], 0.9);
        let b = to_pixel_box(&d, 101, 401).unwrap();
        assert_eq!(
            b,
            PixelBox {
                x: 10,
                y: 100,
                width: 91,
                height: 100
            }
        );
    }

    #[test]
    fn inverted_box_is_rejected() {
        let d = RawDetection::new([0.5, 0.1, 0.4, 0.2], 0.9);
        assert_eq!(to_pixel_box(&d, 100, 100), None);
    }
}
