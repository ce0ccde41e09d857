//! Persisted calibration marks.
//!
//! Expected headers:
//! pixel,capacity
//!
//! Exactly two data rows follow: the min mark first, then the max mark.
//!
//! Example:
//! pixel,capacity
//! 500,0.0
//! 100,50.0
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct MarkRow {
    /// Vertical pixel row in the full camera frame.
    pub pixel: i32,
    /// Volume printed on the tube at that mark.
    pub capacity: f64,
}

const HEADERS: [&str; 2] = ["pixel", "capacity"];

fn check_rows(rows: &[MarkRow]) -> eyre::Result<[MarkRow; 2]> {
    let [min, max] = rows else {
        eyre::bail!("marks CSV must contain exactly two rows, got {}", rows.len());
    };
    if !min.capacity.is_finite() || !max.capacity.is_finite() {
        eyre::bail!("marks CSV capacities must be finite numbers");
    }
    if min.pixel == max.pixel {
        eyre::bail!(
            "marks CSV rows share pixel {}; the two marks must be distinct",
            min.pixel
        );
    }
    Ok([*min, *max])
}

pub fn load_marks_csv(path: &Path) -> eyre::Result<[MarkRow; 2]> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open marks CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != HEADERS {
        eyre::bail!(
            "marks CSV must have headers 'pixel,capacity', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::with_capacity(2);
    for (idx, rec) in rdr.deserialize::<MarkRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }
    check_rows(&rows)
}

pub fn save_marks_csv(path: &Path, rows: &[MarkRow; 2]) -> eyre::Result<()> {
    check_rows(rows)?;
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row)
            .map_err(|e| eyre::eyre!("encode mark row: {e}"))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| eyre::eyre!("flush marks CSV: {e}"))?;
    crate::write_atomic(path, &bytes)
        .map_err(|e| eyre::eyre!("write marks CSV {}: {e}", path.display()))
}
