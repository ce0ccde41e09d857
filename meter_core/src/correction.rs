//! Lens and parallax correction of detected rows.
//!
//! Both corrections run in full-frame pixel rows:
//!
//! 1. lens: `y' = y + (a*y^2 + b*y + c)`, an empirical fit of one lens's vertical distortion;
//! 2. parallax: the camera looks at the tube from a finite distance, so a row
//!    away from the midpoint between the marks appears shifted by
//!    `(d/2) * (mid - y') / D`, which is subtracted from `y'`.

use crate::marks::{MarkPair, TubeGeometry};

/// Quadratic vertical distortion model, `offset(y) = a*y^2 + b*y + c` pixels.
///
/// Coefficients belong to one physical lens; replace them per deployment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensModel {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Default for LensModel {
    fn default() -> Self {
        Self {
            a: -2.6e-5,
            b: 5.12e-2,
            c: -3.31,
        }
    }
}

impl LensModel {
    /// Model that leaves every row unchanged.
    pub const IDENTITY: Self = Self {
        a: 0.0,
        b: 0.0,
        c: 0.0,
    };

    #[inline]
    pub fn offset(&self, y: f64) -> f64 {
        self.a * y * y + self.b * y + self.c
    }

    #[inline]
    pub fn correct(&self, y: f64) -> f64 {
        y + self.offset(y)
    }
}

/// Parallax shift at lens-corrected row `y_lens`.
///
/// Zero at the midpoint between the marks, growing linearly with the distance
/// from it, scaled by tube radius over camera distance.
#[inline]
pub fn parallax_offset(y_lens: f64, marks: &MarkPair, geometry: &TubeGeometry) -> f64 {
    let from_mid = marks.midpoint() - y_lens;
    (geometry.tube_diameter() / 2.0) * from_mid / geometry.camera_distance()
}

/// Breakdown of one correction, for logging and overlays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    pub raw: i32,
    pub lens: f64,
    pub parallax: f64,
    pub corrected: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricCorrector {
    lens: LensModel,
    geometry: TubeGeometry,
}

impl GeometricCorrector {
    pub fn new(lens: LensModel, geometry: TubeGeometry) -> Self {
        Self { lens, geometry }
    }

    pub fn lens(&self) -> &LensModel {
        &self.lens
    }

    pub fn geometry(&self) -> &TubeGeometry {
        &self.geometry
    }

    /// Corrected row for raw row `y`; the fractional part is truncated toward zero.
    pub fn correct(&self, y: i32, marks: &MarkPair) -> i32 {
        self.correct_detailed(y, marks).corrected
    }

    pub fn correct_detailed(&self, y: i32, marks: &MarkPair) -> Correction {
        let raw = f64::from(y);
        let lens = self.lens.offset(raw);
        let y_lens = raw + lens;
        let parallax = parallax_offset(y_lens, marks, &self.geometry);
        // `as` saturates on overflow and maps NaN to 0
        let corrected = (y_lens - parallax).trunc() as i32;
        Correction {
            raw: y,
            lens,
            parallax,
            corrected,
        }
    }
}
