//! Human-readable error descriptions and structured JSON error formatting.

use meter_core::error::{BuildError, MeterError};

/// Invalid argument combination that clap cannot express.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(pub String);

pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_DEGENERATE: i32 = 3;
pub const EXIT_CONFIG: i32 = 4;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(u) = err.downcast_ref::<UsageError>() {
        return format!("What happened: {u}.\nHow to fix: See `level-meter --help`.");
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingGeometry => {
                "What happened: The meter was built without tube geometry.\nLikely causes: The [geometry] section could not be mapped.\nHow to fix: Set geometry.object_distance and geometry.tube_diameter in the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the config file.\nHow to fix: Edit the config file, then rerun. `level-meter init-config --force` writes a fresh default."
            ),
        };
    }

    if let Some(me) = err.downcast_ref::<MeterError>() {
        return match me {
            MeterError::DegenerateCalibration(px) => format!(
                "What happened: Both calibration marks are at row {px}.\nLikely causes: The same row was clicked twice or the marks file repeats a row.\nHow to fix: Place the two marks on different graduations."
            ),
            MeterError::Config(msg) => format!(
                "What happened: Configuration is invalid ({msg}).\nLikely causes: A malformed line or an out-of-range value.\nHow to fix: Edit the config file, then rerun. `level-meter init-config --force` writes a fresh default."
            ),
            MeterError::Geometry(msg) => format!(
                "What happened: Tube geometry is invalid ({msg}).\nLikely causes: Zero or negative object distance in the config.\nHow to fix: Measure the camera-to-tube distance and set geometry.object_distance."
            ),
            MeterError::Timeout(what) => format!(
                "What happened: Timed out waiting for the {what}.\nLikely causes: The collaborator is not running or is overloaded.\nHow to fix: Check that it is reachable; raise output.connect_timeout_ms for the output."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("marks csv must have headers") {
        return "Invalid headers in marks CSV. Expected 'pixel,capacity'.".to_string();
    }
    if lower.contains("marks csv") {
        return format!(
            "What happened: {msg}.\nHow to fix: The marks CSV needs a `pixel,capacity` header and exactly two rows on different pixels."
        );
    }
    if lower.contains("manifest") {
        return format!(
            "What happened: {msg}.\nLikely causes: A line is not a JSON object with `frame` and `detections`.\nHow to fix: Fix the manifest; frame paths are relative to the manifest file."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<UsageError>().is_some() {
        return EXIT_USAGE;
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return EXIT_CONFIG;
    }
    match err.downcast_ref::<MeterError>() {
        Some(MeterError::DegenerateCalibration(_)) => EXIT_DEGENERATE,
        Some(MeterError::Config(_) | MeterError::Geometry(_)) => EXIT_CONFIG,
        _ => EXIT_GENERIC,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<UsageError>().is_some() {
        return "Usage";
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    match err.downcast_ref::<MeterError>() {
        Some(MeterError::DegenerateCalibration(_)) => "DegenerateCalibration",
        Some(MeterError::Config(_) | MeterError::Geometry(_)) => "Config",
        Some(MeterError::Timeout(_)) => "Timeout",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let mut obj = json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    });
    if let Some(MeterError::DegenerateCalibration(px)) = err.downcast_ref::<MeterError>() {
        obj["details"] = json!({ "row": px });
    }
    obj.to_string()
}
