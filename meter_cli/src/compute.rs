//! `compute`: calibration math on raw rows, no images involved.

use eyre::Result;
use meter_config::Config;
use meter_core::volume::volume_at;
use meter_core::{LevelMeter, MarkPair, PlacedMark};
use serde::Serialize;

use crate::error_fmt::UsageError;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComputedRow {
    pub raw: i32,
    pub lens: f64,
    pub parallax: f64,
    pub corrected: i32,
    pub volume: f64,
}

pub fn compute(cfg: &Config, marks: &[PlacedMark], raws: &[i32]) -> Result<Vec<ComputedRow>> {
    let [min, max] = marks else {
        return Err(UsageError(format!(
            "--mark must be given exactly twice, got {}",
            marks.len()
        ))
        .into());
    };
    let pair = MarkPair::new(*min, *max)?;
    let meter = LevelMeter::from_config(cfg)?;
    let corrector = meter.corrector();
    Ok(raws
        .iter()
        .map(|&raw| {
            let c = corrector.correct_detailed(raw, &pair);
            ComputedRow {
                raw,
                lens: c.lens,
                parallax: c.parallax,
                corrected: c.corrected,
                volume: volume_at(c.corrected, &pair),
            }
        })
        .collect())
}

pub fn print_rows(rows: &[ComputedRow], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(rows)?);
        return Ok(());
    }
    for r in rows {
        println!(
            "raw={} lens={:+.3} parallax={:+.3} corrected={} volume={}",
            r.raw,
            r.lens,
            r.parallax,
            r.corrected,
            meter_core::output::format_value(r.volume)
        );
    }
    Ok(())
}
