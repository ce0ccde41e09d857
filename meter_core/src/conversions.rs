//! Conversions from `meter_config` types to the pipeline's types.

use crate::correction::LensModel;
use crate::detection::DetectionFilter;
use crate::edge::{EdgeLocalizer, EmptyColumnPolicy};
use crate::error::{BuildError, MeterError};
use crate::frame::FramePreparer;
use crate::marks::{PlacedMark, TubeGeometry};
use crate::meter::LevelMeter;
use crate::runner::RunnerCfg;

impl From<&meter_config::LensCfg> for LensModel {
    fn from(c: &meter_config::LensCfg) -> Self {
        Self {
            a: c.a,
            b: c.b,
            c: c.c,
        }
    }
}

impl From<meter_config::EmptyColumns> for EmptyColumnPolicy {
    fn from(c: meter_config::EmptyColumns) -> Self {
        match c {
            meter_config::EmptyColumns::ZeroFill => Self::ZeroFill,
            meter_config::EmptyColumns::Exclude => Self::Exclude,
        }
    }
}

impl From<&meter_config::EdgeCfg> for EdgeLocalizer {
    fn from(c: &meter_config::EdgeCfg) -> Self {
        Self::new(c.columns, c.empty_columns.into())
    }
}

impl From<&meter_config::DetectorCfg> for DetectionFilter {
    fn from(c: &meter_config::DetectorCfg) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self::new(c.score_threshold as f32, c.max_detections)
    }
}

impl From<&meter_config::Config> for FramePreparer {
    fn from(c: &meter_config::Config) -> Self {
        Self {
            rotate_cw: c.camera.rotate_cw,
            percent_x: c.roi.percent_x,
            percent_y: c.roi.percent_y,
        }
    }
}

impl TryFrom<&meter_config::GeometryCfg> for TubeGeometry {
    type Error = MeterError;

    fn try_from(c: &meter_config::GeometryCfg) -> Result<Self, Self::Error> {
        Self::new(c.tube_diameter, c.object_distance)
    }
}

impl From<meter_config::MarkRow> for PlacedMark {
    fn from(r: meter_config::MarkRow) -> Self {
        Self {
            pixel: r.pixel,
            capacity: r.capacity,
        }
    }
}

impl From<PlacedMark> for meter_config::MarkRow {
    fn from(m: PlacedMark) -> Self {
        Self {
            pixel: m.pixel,
            capacity: m.capacity,
        }
    }
}

impl From<&meter_config::Config> for RunnerCfg {
    fn from(c: &meter_config::Config) -> Self {
        Self {
            frame_delay: std::time::Duration::from_millis(c.runner.frame_delay_ms),
            absent_text: c.output.absent_text.clone(),
            canvas_height: c.display.canvas_height,
            max_frames: None,
        }
    }
}

impl LevelMeter {
    /// Build a meter from a (validated) configuration.
    pub fn from_config(cfg: &meter_config::Config) -> Result<Self, BuildError> {
        let geometry = TubeGeometry::try_from(&cfg.geometry).map_err(|e| match e {
            MeterError::Geometry(msg) => BuildError::InvalidConfig(msg),
            _ => BuildError::MissingGeometry,
        })?;
        Self::builder()
            .geometry(geometry)
            .lens(LensModel::from(&cfg.lens))
            .edge(EdgeLocalizer::from(&cfg.edge))
            .filter(DetectionFilter::from(&cfg.detector))
            .preparer(FramePreparer::from(cfg))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        let cfg = meter_config::Config::default();
        let meter = LevelMeter::from_config(&cfg).unwrap();
        assert_eq!(meter.edge().columns(), 5);
        assert!((meter.filter().threshold() - 0.2).abs() < 1e-6);
        assert_eq!(*meter.corrector().lens(), LensModel::default());
        assert!(meter.preparer().rotate_cw);
    }

    #[test]
    fn zero_distance_is_a_config_error() {
        let mut cfg = meter_config::Config::default();
        cfg.geometry.object_distance = 0.0;
        let err = LevelMeter::from_config(&cfg).unwrap_err();
        assert!(matches!(err, BuildError::InvalidConfig(_)));
    }
}
