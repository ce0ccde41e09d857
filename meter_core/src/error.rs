use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeterError {
    /// Both marks sit on the same pixel row, so no scale can be derived.
    #[error("degenerate calibration: both marks are at pixel {0}")]
    DegenerateCalibration(i32),
    #[error("invalid geometry: {0}")]
    Geometry(&'static str),
    #[error("frame source error: {0}")]
    Frame(String),
    #[error("detector error: {0}")]
    Detector(String),
    #[error("output error: {0}")]
    Output(String),
    #[error("timeout waiting for {0}")]
    Timeout(&'static str),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing tube geometry")]
    MissingGeometry,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
