//! Linear volume scale between the two calibration marks.

use crate::marks::MarkPair;

/// Round to two decimals, exact halves to even. Non-finite input passes through.
#[inline]
pub fn round_hundredths(v: f64) -> f64 {
    if !v.is_finite() {
        return v;
    }
    (v * 100.0).round_ties_even() / 100.0
}

/// Volume at corrected row `y_corr`, rounded to 0.01.
///
/// Linear in `y_corr`; rows beyond the marks extrapolate (no clamping). The
/// branch depends on which mark has the larger row, so the sign of the scale is
/// right whether capacity grows up or down the image.
pub fn volume_at(y_corr: i32, marks: &MarkPair) -> f64 {
    let (p0, c0) = (f64::from(marks.min().pixel), marks.min().capacity);
    let (p1, c1) = (f64::from(marks.max().pixel), marks.max().capacity);
    let span = f64::from(marks.span_px());
    let y = f64::from(y_corr);
    let volume = if p0 > p1 {
        c1 - (y - p1) * (c1 - c0) / span
    } else {
        c0 + (y - p0) * (c1 - c0) / span
    };
    round_hundredths(volume)
}

/// Reading for an optional detection: absent when either the row or the marks are.
pub fn reading(y_corr: Option<i32>, marks: Option<&MarkPair>) -> Option<f64> {
    Some(volume_at(y_corr?, marks?))
}
