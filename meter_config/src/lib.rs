#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and mark persistence for the level meter.
//!
//! - `Config` and its sections are deserialized from TOML or from the legacy
//!   `Key=Value` format and validated.
//! - The marks CSV loader enforces headers and exactly two rows.
use serde::{Deserialize, Serialize};

mod atomic;
pub mod legacy;
pub mod marks;

pub use atomic::write_atomic;
pub use legacy::{load_legacy, to_legacy};
pub use marks::{MarkRow, load_marks_csv, save_marks_csv};

/// Frame size as `WIDTHxHEIGHT`, e.g. `1280x720`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("resolution must look like WIDTHxHEIGHT, got {s:?}"))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("resolution width {w:?}: {e}"))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("resolution height {h:?}: {e}"))?;
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for Resolution {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Resolution> for String {
    fn from(r: Resolution) -> Self {
        r.to_string()
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraCfg {
    pub index: u32,
    pub resolution: Resolution,
    /// Rotate every frame 90 degrees clockwise before analysis.
    pub rotate_cw: bool,
}

impl Default for CameraCfg {
    fn default() -> Self {
        Self {
            index: 0,
            resolution: Resolution {
                width: 1280,
                height: 720,
            },
            rotate_cw: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeometryCfg {
    /// Camera lens to tube distance, same unit as `tube_diameter`.
    pub object_distance: f64,
    /// Inner tube diameter.
    pub tube_diameter: f64,
}

impl Default for GeometryCfg {
    fn default() -> Self {
        Self {
            object_distance: 200.0,
            tube_diameter: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayCfg {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub line_width: u32,
    pub font_size: u32,
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self {
            canvas_width: 400,
            canvas_height: 600,
            line_width: 1,
            font_size: 1,
        }
    }
}

/// Centered crop, as percentages of the (rotated) frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoiCfg {
    pub percent_x: u32,
    pub percent_y: u32,
}

impl Default for RoiCfg {
    fn default() -> Self {
        Self {
            percent_x: 100,
            percent_y: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorCfg {
    /// Detections must score strictly above this value.
    pub score_threshold: f64,
    /// Highest-ranked detections considered per frame (1 or 2).
    pub max_detections: usize,
}

impl Default for DetectorCfg {
    fn default() -> Self {
        Self {
            score_threshold: 0.2,
            max_detections: 2,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyColumns {
    /// A column without foreground counts as row 0 (historic behavior).
    #[default]
    ZeroFill,
    /// Columns without foreground are left out of the average.
    Exclude,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EdgeCfg {
    /// Number of adjacent columns averaged around the patch center.
    pub columns: usize,
    pub empty_columns: EmptyColumns,
}

impl Default for EdgeCfg {
    fn default() -> Self {
        Self {
            columns: 5,
            empty_columns: EmptyColumns::ZeroFill,
        }
    }
}

/// Quadratic lens fit: `offset(y) = a*y^2 + b*y + c`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LensCfg {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Default for LensCfg {
    fn default() -> Self {
        Self {
            a: -2.6e-5,
            b: 5.12e-2,
            c: -3.31,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputCfg {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    /// Text written in place of an absent reading.
    pub absent_text: String,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 64250,
            connect_timeout_ms: 200,
            absent_text: "None".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerCfg {
    /// Pause between frames (ms).
    pub frame_delay_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            frame_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub camera: CameraCfg,
    pub geometry: GeometryCfg,
    pub display: DisplayCfg,
    pub roi: RoiCfg,
    pub detector: DetectorCfg,
    pub edge: EdgeCfg,
    pub lens: LensCfg,
    pub output: OutputCfg,
    pub runner: RunnerCfg,
    pub logging: Logging,
}

/// On-disk flavor of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Legacy,
}

impl ConfigFormat {
    /// `.toml` files are TOML; everything else (e.g. `Level_Meter.cfg`) is legacy.
    pub fn for_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Legacy,
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct Loaded {
    pub config: Config,
    /// Keys present in a legacy file that the schema does not know.
    pub unknown_keys: Vec<String>,
    /// True when the file did not exist and defaults were written.
    pub created: bool,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Render a config in the given on-disk format.
pub fn render(cfg: &Config, format: ConfigFormat) -> eyre::Result<String> {
    match format {
        ConfigFormat::Toml => {
            toml::to_string_pretty(cfg).map_err(|e| eyre::eyre!("serialize config: {e}"))
        }
        ConfigFormat::Legacy => to_legacy(cfg),
    }
}

/// Load `path`, or write the defaults there when it does not exist yet.
pub fn load_or_create(path: &std::path::Path) -> eyre::Result<Loaded> {
    let format = ConfigFormat::for_path(path);
    if !path.exists() {
        let config = Config::default();
        let text = render(&config, format)?;
        write_atomic(path, text.as_bytes())
            .map_err(|e| eyre::eyre!("create config {}: {e}", path.display()))?;
        return Ok(Loaded {
            config,
            unknown_keys: Vec::new(),
            created: true,
        });
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {e}", path.display()))?;
    match format {
        ConfigFormat::Toml => {
            let config =
                load_toml(&text).map_err(|e| eyre::eyre!("parse {}: {e}", path.display()))?;
            Ok(Loaded {
                config,
                unknown_keys: Vec::new(),
                created: false,
            })
        }
        ConfigFormat::Legacy => load_legacy(&text),
    }
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Camera
        if self.camera.resolution.width == 0 || self.camera.resolution.height == 0 {
            eyre::bail!("camera.resolution must be non-zero in both dimensions");
        }

        // Geometry
        let g = &self.geometry;
        if !g.object_distance.is_finite() || g.object_distance <= 0.0 {
            eyre::bail!("geometry.object_distance must be > 0");
        }
        if !g.tube_diameter.is_finite() || g.tube_diameter < 0.0 {
            eyre::bail!("geometry.tube_diameter must be >= 0");
        }

        // Display
        if self.display.canvas_width == 0 || self.display.canvas_height == 0 {
            eyre::bail!("display.canvas_width and display.canvas_height must be >= 1");
        }
        if self.display.line_width == 0 {
            eyre::bail!("display.line_width must be >= 1");
        }
        if self.display.font_size == 0 {
            eyre::bail!("display.font_size must be >= 1");
        }

        // ROI
        for (name, v) in [("roi.percent_x", self.roi.percent_x), ("roi.percent_y", self.roi.percent_y)] {
            if !(10..=100).contains(&v) {
                eyre::bail!("{name} must be in [10, 100]");
            }
        }

        // Detector
        let thr = self.detector.score_threshold;
        if !(0.0..=1.0).contains(&thr) {
            eyre::bail!("detector.score_threshold must be in [0.0, 1.0]");
        }
        if !(1..=2).contains(&self.detector.max_detections) {
            eyre::bail!("detector.max_detections must be 1 or 2");
        }

        // Edge
        if self.edge.columns == 0 {
            eyre::bail!("edge.columns must be >= 1");
        }

        // Lens
        if ![self.lens.a, self.lens.b, self.lens.c]
            .iter()
            .all(|v| v.is_finite())
        {
            eyre::bail!("lens coefficients must be finite");
        }

        // Output
        if self.output.port == 0 {
            eyre::bail!("output.port must be > 0");
        }
        if self.output.host.trim().is_empty() {
            eyre::bail!("output.host must not be empty");
        }
        if self.output.connect_timeout_ms == 0 {
            eyre::bail!("output.connect_timeout_ms must be >= 1");
        }

        // Runner
        if self.runner.frame_delay_ms == 0 {
            eyre::bail!("runner.frame_delay_ms must be >= 1");
        }

        Ok(())
    }
}
