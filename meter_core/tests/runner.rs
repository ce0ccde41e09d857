use std::sync::atomic::Ordering;
use std::time::Duration;

use meter_core::mocks::{
    FailingSink, MemorySink, ScriptedDetector, VecFrameSource, detection_for_row, synthetic_tube,
};
use meter_core::{
    FramePreparer, LevelMeter, MarkCommand, MarkSlot, MeterError, NullSink, PlacedMark, Runner,
    RunnerCfg, TickOutcome, TubeGeometry,
};
use meter_traits::ManualClock;
use rstest::{fixture, rstest};

const W: u32 = 200;
const H: u32 = 600;

#[fixture]
fn meter() -> LevelMeter {
    LevelMeter::builder()
        .geometry(TubeGeometry::new(6.0, 200.0).unwrap())
        .preparer(FramePreparer {
            rotate_cw: false,
            percent_x: 100,
            percent_y: 100,
        })
        .build()
        .unwrap()
}

fn cfg() -> RunnerCfg {
    RunnerCfg {
        frame_delay: Duration::from_millis(100),
        ..RunnerCfg::default()
    }
}

fn frames(n: usize) -> VecFrameSource {
    VecFrameSource::new((0..n).map(|_| synthetic_tube(W, H, &[300])))
}

fn marks() -> MarkCommand {
    MarkCommand::Replace(
        PlacedMark {
            pixel: 500,
            capacity: 0.0,
        },
        PlacedMark {
            pixel: 100,
            capacity: 50.0,
        },
    )
}

#[rstest]
fn uncalibrated_then_calibrated(meter: LevelMeter) {
    let sink = MemorySink::new();
    let detector = ScriptedDetector::constant(vec![detection_for_row(300, H, 0.9)]);
    let mut runner = Runner::with_clock(
        frames(2),
        detector,
        sink.clone(),
        meter,
        cfg(),
        ManualClock::new(),
    );
    let handle = runner.mark_handle();

    assert!(matches!(runner.tick(), TickOutcome::Reported { .. }));
    assert!(handle.send(marks()));
    match runner.tick() {
        TickOutcome::Reported { report, .. } => {
            assert!(report.calibrated);
            assert!(report.readings.top.is_some());
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(runner.tick(), TickOutcome::EndOfStream);

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "None,None\r\n");
    assert!(lines[1].ends_with(",None\r\n"));
    assert!(!lines[1].starts_with("None"));
}

#[rstest]
fn failures_skip_ticks_and_are_counted(meter: LevelMeter) {
    let mut source = frames(1);
    source.push_error("camera unplugged");
    source.push(synthetic_tube(W, H, &[300]));
    source.push(synthetic_tube(W, H, &[300]));

    let mut detector = ScriptedDetector::new([vec![detection_for_row(300, H, 0.9)]]);
    detector.push_error("model timeout");

    let clock = ManualClock::new();
    let mut runner =
        Runner::with_clock(source, detector, FailingSink, meter, cfg(), clock.clone());
    let mut skipped = Vec::new();
    let summary = runner.run(|tick| {
        if let TickOutcome::Skipped(e) = tick.outcome {
            skipped.push(e.clone());
        }
    });

    assert_eq!(summary.frames, 4);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.reported, 2);
    assert_eq!(summary.sink_failures, 2);
    assert!(matches!(skipped[0], MeterError::Frame(_)));
    assert_eq!(skipped[1], MeterError::Timeout("detector"));
    // one pause per processed tick
    assert_eq!(clock.elapsed(), Duration::from_millis(400));
}

#[rstest]
fn coincident_marks_suspend_output(meter: LevelMeter) {
    let sink = MemorySink::new();
    let detector = ScriptedDetector::constant(vec![detection_for_row(300, H, 0.9)]);
    let mut runner = Runner::with_clock(
        frames(3),
        detector,
        sink.clone(),
        meter,
        cfg(),
        ManualClock::new(),
    );
    let handle = runner.mark_handle();
    handle.click(250);
    handle.click(250);

    assert_eq!(runner.tick(), TickOutcome::Degenerate(250));
    assert_eq!(runner.tick(), TickOutcome::Degenerate(250));
    assert!(sink.lines().is_empty());

    handle.set_pixel(MarkSlot::Max, 100);
    assert!(matches!(runner.tick(), TickOutcome::Reported { .. }));
    assert_eq!(sink.lines().len(), 1);
}

#[rstest]
fn canvas_click_maps_through_roi(meter: LevelMeter) {
    let detector = ScriptedDetector::constant(Vec::new());
    let cfg = RunnerCfg {
        canvas_height: 300,
        ..cfg()
    };
    let mut runner =
        Runner::with_clock(frames(2), detector, NullSink, meter, cfg, ManualClock::new());
    let handle = runner.mark_handle();

    // no frame yet, so the click cannot be mapped
    handle.canvas_click(150);
    runner.tick();
    assert_eq!(runner.marks().mark(MarkSlot::Min).pixel, None);

    handle.canvas_click(150);
    handle.set_capacity(MarkSlot::Min, 5.0);
    runner.tick();
    let min = runner.marks().mark(MarkSlot::Min);
    assert_eq!(min.pixel, Some(300));
    assert_eq!(min.capacity, 5.0);
}

#[rstest]
fn shutdown_flag_stops_the_loop(meter: LevelMeter) {
    let detector = ScriptedDetector::constant(Vec::new());
    let mut runner =
        Runner::with_clock(frames(10), detector, NullSink, meter, cfg(), ManualClock::new());
    let stop = runner.shutdown_flag();
    let summary = runner.run(|tick| {
        if tick.index == 2 {
            stop.store(true, Ordering::Relaxed);
        }
    });
    assert_eq!(summary.frames, 3);
    assert!(summary.interrupted);
}

#[rstest]
fn max_frames_limits_the_run(meter: LevelMeter) {
    let detector = ScriptedDetector::constant(Vec::new());
    let cfg = RunnerCfg {
        max_frames: Some(2),
        ..cfg()
    };
    let mut runner =
        Runner::with_clock(frames(10), detector, NullSink, meter, cfg, ManualClock::new());
    let summary = runner.run(|_| {});
    assert_eq!(summary.frames, 2);
    assert!(!summary.interrupted);
}
