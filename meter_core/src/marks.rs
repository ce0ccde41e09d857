//! Calibration marks and tube geometry.
//!
//! Two user-placed marks anchor the volume scale. The "min" mark is whichever
//! was placed first and the "max" mark the second; their pixel rows may be in
//! either vertical order (inverted scales are fine).

use crate::error::MeterError;

/// Which of the two marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkSlot {
    Min,
    Max,
}

/// One reference mark. `pixel` stays `None` until the user places it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationMark {
    pub pixel: Option<i32>,
    pub capacity: f64,
}

/// A mark known to be placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedMark {
    pub pixel: i32,
    pub capacity: f64,
}

/// Both marks placed, on distinct rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkPair {
    min: PlacedMark,
    max: PlacedMark,
}

impl MarkPair {
    pub fn new(min: PlacedMark, max: PlacedMark) -> Result<Self, MeterError> {
        if min.pixel == max.pixel {
            return Err(MeterError::DegenerateCalibration(min.pixel));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> PlacedMark {
        self.min
    }

    pub fn max(&self) -> PlacedMark {
        self.max
    }

    /// Pixel distance between the marks; never zero.
    pub fn span_px(&self) -> u32 {
        let span = i64::from(self.max.pixel).abs_diff(i64::from(self.min.pixel));
        // two i32 rows are at most u32::MAX apart
        u32::try_from(span).unwrap_or(u32::MAX)
    }

    /// Row halfway between the marks.
    pub fn midpoint(&self) -> f64 {
        (f64::from(self.min.pixel) + f64::from(self.max.pixel)) / 2.0
    }

    /// Same marks with roles exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            min: self.max,
            max: self.min,
        }
    }
}

/// Tube and camera constants for a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TubeGeometry {
    tube_diameter: f64,
    camera_distance: f64,
}

impl TubeGeometry {
    /// `camera_distance` must be > 0 and `tube_diameter` >= 0, both finite.
    pub fn new(tube_diameter: f64, camera_distance: f64) -> Result<Self, MeterError> {
        if !tube_diameter.is_finite() || tube_diameter < 0.0 {
            return Err(MeterError::Geometry("tube diameter must be finite and >= 0"));
        }
        if !camera_distance.is_finite() || camera_distance <= 0.0 {
            return Err(MeterError::Geometry("camera distance must be finite and > 0"));
        }
        Ok(Self {
            tube_diameter,
            camera_distance,
        })
    }

    pub fn tube_diameter(&self) -> f64 {
        self.tube_diameter
    }

    pub fn camera_distance(&self) -> f64 {
        self.camera_distance
    }
}

/// The two marks plus the click bookkeeping of the mark-placement front end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkStore {
    min: CalibrationMark,
    max: CalibrationMark,
}

impl MarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with both marks placed.
    pub fn with_marks(min: PlacedMark, max: PlacedMark) -> Self {
        Self {
            min: CalibrationMark {
                pixel: Some(min.pixel),
                capacity: min.capacity,
            },
            max: CalibrationMark {
                pixel: Some(max.pixel),
                capacity: max.capacity,
            },
        }
    }

    /// Register a click at frame row `y`.
    ///
    /// The first click places the min mark and the second the max mark. A click
    /// with both placed clears them and places the min mark again. Capacities
    /// are kept across resets.
    pub fn click(&mut self, y: i32) -> MarkSlot {
        match (self.min.pixel, self.max.pixel) {
            (Some(_), None) => {
                self.max.pixel = Some(y);
                MarkSlot::Max
            }
            _ => {
                self.min.pixel = Some(y);
                self.max.pixel = None;
                MarkSlot::Min
            }
        }
    }

    pub fn set_capacity(&mut self, slot: MarkSlot, capacity: f64) {
        self.slot_mut(slot).capacity = capacity;
    }

    /// Move an already placed mark. Returns false (and changes nothing) when
    /// that mark has not been placed yet.
    pub fn set_pixel(&mut self, slot: MarkSlot, pixel: i32) -> bool {
        let mark = self.slot_mut(slot);
        if mark.pixel.is_none() {
            return false;
        }
        mark.pixel = Some(pixel);
        true
    }

    /// Unplace both marks.
    pub fn clear(&mut self) {
        self.min.pixel = None;
        self.max.pixel = None;
    }

    pub fn mark(&self, slot: MarkSlot) -> CalibrationMark {
        match slot {
            MarkSlot::Min => self.min,
            MarkSlot::Max => self.max,
        }
    }

    /// Placed marks in click order (0, 1 or 2 entries).
    pub fn placed(&self) -> impl Iterator<Item = PlacedMark> + '_ {
        [self.min, self.max].into_iter().filter_map(|m| {
            m.pixel.map(|pixel| PlacedMark {
                pixel,
                capacity: m.capacity,
            })
        })
    }

    /// `Ok(None)` until both marks are placed; an error when they coincide.
    pub fn pair(&self) -> Result<Option<MarkPair>, MeterError> {
        match (self.min.pixel, self.max.pixel) {
            (Some(a), Some(b)) => MarkPair::new(
                PlacedMark {
                    pixel: a,
                    capacity: self.min.capacity,
                },
                PlacedMark {
                    pixel: b,
                    capacity: self.max.capacity,
                },
            )
            .map(Some),
            _ => Ok(None),
        }
    }

    fn slot_mut(&mut self, slot: MarkSlot) -> &mut CalibrationMark {
        match slot {
            MarkSlot::Min => &mut self.min,
            MarkSlot::Max => &mut self.max,
        }
    }
}
