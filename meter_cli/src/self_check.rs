//! `self-check`: the configured pipeline against a synthetic tube.

use eyre::Result;
use meter_config::Config;
use meter_core::mocks::{detection_for_row, synthetic_tube};
use meter_core::{ByRank, LevelMeter, MarkPair, PlacedMark, PreparedFrame, Roi};

const WIDTH: u32 = 240;
const HEIGHT: u32 = 640;
const LEVELS: [u32; 2] = [220, 420];

pub fn run(cfg: &Config, json: bool) -> Result<()> {
    let meter = LevelMeter::from_config(cfg)?;

    // already in detector orientation, so skip rotation and crop
    let frame = PreparedFrame {
        image: synthetic_tube(WIDTH, HEIGHT, &LEVELS),
        roi: Roi::full(WIDTH, HEIGHT),
        full_size: (WIDTH, HEIGHT),
    };
    let detections = [
        detection_for_row(LEVELS[1], HEIGHT, 0.95),
        detection_for_row(LEVELS[0], HEIGHT, 0.90),
    ];
    let marks = MarkPair::new(
        PlacedMark {
            pixel: 600,
            capacity: 0.0,
        },
        PlacedMark {
            pixel: 40,
            capacity: 100.0,
        },
    )?;

    let located = meter.locate(&frame, &detections);
    let rows = located.map(|slot| slot.map(|(row, _)| row));
    let expect = ByRank::new(
        i32::try_from(LEVELS[1] + 2).ok(),
        i32::try_from(LEVELS[0] + 2).ok(),
    );
    if rows != expect {
        eyre::bail!("self-check failed: located rows {rows:?}, expected {expect:?}");
    }
    let report = meter.measure_rows(located, Some(&marks));
    let (Some(top), Some(bottom)) = (report.readings.top, report.readings.bottom) else {
        eyre::bail!("self-check failed: missing readings {:?}", report.readings);
    };
    if top <= bottom {
        eyre::bail!("self-check failed: top reading {top} not above bottom reading {bottom}");
    }
    tracing::info!(top, bottom, "self-check ok");
    if json {
        println!(
            "{}",
            serde_json::json!({ "ok": true, "top": top, "bottom": bottom })
        );
    } else {
        println!("self-check ok: top={top} bottom={bottom}");
    }
    Ok(())
}
