//! Per-frame measurement: detections in, ordered readings out.
//!
//! `LevelMeter` is stateless across frames. Marks are passed with each call so
//! the mark store stays with its single writer.

use std::marker::PhantomData;

use meter_traits::RawDetection;

use crate::correction::{GeometricCorrector, LensModel};
use crate::detection::{ByRank, DetectionFilter, to_pixel_box};
use crate::edge::EdgeLocalizer;
use crate::error::{BuildError, Result};
use crate::frame::{FramePreparer, PreparedFrame};
use crate::marks::{MarkPair, MarkStore, TubeGeometry};
use crate::preprocess::{BinaryFrame, Binarizer};
use crate::tracker::{DetectedInterface, InterfaceReadings, order_interfaces};
use crate::volume;

/// Everything measured in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameReport {
    /// Interfaces in detector confidence order.
    pub interfaces: ByRank<Option<DetectedInterface>>,
    /// Readings labeled top and bottom.
    pub readings: InterfaceReadings,
    /// Whether a complete mark pair was available.
    pub calibrated: bool,
}

impl FrameReport {
    pub fn detected(&self) -> usize {
        self.interfaces.iter().filter(|i| i.is_some()).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelMeter {
    preparer: FramePreparer,
    binarizer: Binarizer,
    edge: EdgeLocalizer,
    corrector: GeometricCorrector,
    filter: DetectionFilter,
}

impl LevelMeter {
    pub fn builder() -> LevelMeterBuilder<Missing> {
        LevelMeterBuilder::default()
    }

    pub fn preparer(&self) -> &FramePreparer {
        &self.preparer
    }

    pub fn corrector(&self) -> &GeometricCorrector {
        &self.corrector
    }

    pub fn filter(&self) -> &DetectionFilter {
        &self.filter
    }

    pub fn edge(&self) -> &EdgeLocalizer {
        &self.edge
    }

    /// Rotate and crop a raw camera frame.
    pub fn prepare(&self, frame: &image::RgbImage) -> PreparedFrame {
        self.preparer.prepare(frame)
    }

    /// Measure a prepared frame against the current marks.
    ///
    /// Fails only when both marks sit on the same row.
    pub fn process_frame(
        &self,
        frame: &PreparedFrame,
        detections: &[RawDetection],
        marks: &MarkStore,
    ) -> Result<FrameReport> {
        let pair = marks.pair()?;
        Ok(self.measure(frame, detections, pair.as_ref()))
    }

    /// Full-frame lower-edge rows of the selected detections, by rank.
    pub fn locate(
        &self,
        frame: &PreparedFrame,
        detections: &[RawDetection],
    ) -> ByRank<Option<(i32, f32)>> {
        let selected = self.filter.select(detections);
        if selected.iter().all(Option::is_none) {
            return ByRank::default();
        }
        let binary = self.binarizer.binarize(&frame.image);
        selected.map(|d| {
            d.and_then(|d| self.edge_of(&binary, frame, &d).map(|row| (row, d.score)))
        })
    }

    fn edge_of(&self, binary: &BinaryFrame, frame: &PreparedFrame, det: &RawDetection) -> Option<i32> {
        let (w, h) = frame.image.dimensions();
        let pbox = to_pixel_box(det, w, h)?;
        let patch = binary.patch(&pbox);
        let offset = i32::try_from(frame.roi.y.saturating_add(pbox.y)).ok()?;
        self.edge.lower_edge(&patch, offset)
    }

    /// Measure with an already validated (or absent) mark pair.
    pub fn measure(
        &self,
        frame: &PreparedFrame,
        detections: &[RawDetection],
        marks: Option<&MarkPair>,
    ) -> FrameReport {
        let located = self.locate(frame, detections);
        self.measure_rows(located, marks)
    }

    /// Correction, volume and ordering for rows located elsewhere.
    pub fn measure_rows(
        &self,
        located: ByRank<Option<(i32, f32)>>,
        marks: Option<&MarkPair>,
    ) -> FrameReport {
        let interfaces = located.map(|slot| {
            slot.map(|(raw_position, score)| {
                let corrected_position = marks.map(|m| self.corrector.correct(raw_position, m));
                DetectedInterface {
                    raw_position,
                    score,
                    corrected_position,
                    reading: volume::reading(corrected_position, marks),
                }
            })
        });
        let readings = order_interfaces(interfaces.as_ref().map(Option::as_ref));
        tracing::debug!(
            first = ?interfaces.first.map(|i| i.raw_position),
            second = ?interfaces.second.map(|i| i.raw_position),
            top = ?readings.top,
            bottom = ?readings.bottom,
            "frame measured"
        );
        FrameReport {
            interfaces,
            readings,
            calibrated: marks.is_some(),
        }
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `LevelMeter`; tube geometry is mandatory.
pub struct LevelMeterBuilder<G> {
    geometry: Option<TubeGeometry>,
    lens: LensModel,
    preparer: FramePreparer,
    binarizer: Binarizer,
    edge: EdgeLocalizer,
    filter: DetectionFilter,
    _g: PhantomData<G>,
}

impl Default for LevelMeterBuilder<Missing> {
    fn default() -> Self {
        Self {
            geometry: None,
            lens: LensModel::default(),
            preparer: FramePreparer::default(),
            binarizer: Binarizer::default(),
            edge: EdgeLocalizer::default(),
            filter: DetectionFilter::default(),
            _g: PhantomData,
        }
    }
}

impl<G> LevelMeterBuilder<G> {
    pub fn geometry(self, geometry: TubeGeometry) -> LevelMeterBuilder<Set> {
        LevelMeterBuilder {
            geometry: Some(geometry),
            lens: self.lens,
            preparer: self.preparer,
            binarizer: self.binarizer,
            edge: self.edge,
            filter: self.filter,
            _g: PhantomData,
        }
    }

    pub fn lens(mut self, lens: LensModel) -> Self {
        self.lens = lens;
        self
    }

    pub fn preparer(mut self, preparer: FramePreparer) -> Self {
        self.preparer = preparer;
        self
    }

    pub fn binarizer(mut self, binarizer: Binarizer) -> Self {
        self.binarizer = binarizer;
        self
    }

    pub fn edge(mut self, edge: EdgeLocalizer) -> Self {
        self.edge = edge;
        self
    }

    pub fn filter(mut self, filter: DetectionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Build, checking requirements at runtime.
    pub fn try_build(self) -> std::result::Result<LevelMeter, BuildError> {
        let geometry = self.geometry.ok_or(BuildError::MissingGeometry)?;
        let lens = self.lens;
        if !(lens.a.is_finite() && lens.b.is_finite() && lens.c.is_finite()) {
            return Err(BuildError::InvalidConfig("lens coefficients must be finite"));
        }
        let t = self.filter.threshold();
        if !(0.0..=1.0).contains(&t) {
            return Err(BuildError::InvalidConfig(
                "score threshold must be in [0.0, 1.0]",
            ));
        }
        Ok(LevelMeter {
            preparer: self.preparer,
            binarizer: self.binarizer,
            edge: self.edge,
            corrector: GeometricCorrector::new(lens, geometry),
            filter: self.filter,
        })
    }
}

impl LevelMeterBuilder<Set> {
    pub fn build(self) -> std::result::Result<LevelMeter, BuildError> {
        self.try_build()
    }
}
