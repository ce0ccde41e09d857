use meter_core::mocks::{detection_for_row, synthetic_tube};
use meter_core::volume::volume_at;
use meter_core::{
    FramePreparer, LevelMeter, MarkStore, MeterError, PlacedMark, TubeGeometry, format_line,
};
use meter_traits::RawDetection;
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

#[fixture]
fn marks() -> MarkStore {
    MarkStore::with_marks(
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
fn two_bands_are_located_and_ordered(meter: LevelMeter, marks: MarkStore) {
    let frame = meter.prepare(&synthetic_tube(W, H, &[200, 400]));
    // the lower band is the more confident one
    let detections = [
        detection_for_row(400, H, 0.9),
        detection_for_row(200, H, 0.8),
    ];
    let report = meter.process_frame(&frame, &detections, &marks).unwrap();

    let first = report.interfaces.first.unwrap();
    let second = report.interfaces.second.unwrap();
    // opening and patch dilation each push the edge one row down
    assert_eq!(first.raw_position, 402);
    assert_eq!(second.raw_position, 202);

    let pair = marks.pair().unwrap().unwrap();
    let expect_first = volume_at(meter.corrector().correct(402, &pair), &pair);
    let expect_second = volume_at(meter.corrector().correct(202, &pair), &pair);
    assert_eq!(first.reading, Some(expect_first));
    assert_eq!(second.reading, Some(expect_second));

    // topmost band is interface 1 regardless of confidence
    assert_eq!(report.readings.top, Some(expect_second));
    assert_eq!(report.readings.bottom, Some(expect_first));
    assert_eq!(report.readings.top, Some(36.75));
    assert_eq!(report.readings.bottom, Some(10.5));
}

#[rstest]
fn low_score_detection_never_reaches_the_core(meter: LevelMeter, marks: MarkStore) {
    let frame = meter.prepare(&synthetic_tube(W, H, &[300]));
    let report = meter
        .process_frame(&frame, &[detection_for_row(300, H, 0.15)], &marks)
        .unwrap();
    assert_eq!(report.detected(), 0);
    assert!(report.readings.is_empty());
    assert_eq!(format_line(&report.readings, "None"), "None,None\r\n");
}

#[rstest]
fn uncalibrated_frame_still_locates(meter: LevelMeter) {
    let frame = meter.prepare(&synthetic_tube(W, H, &[300]));
    let report = meter
        .process_frame(&frame, &[detection_for_row(300, H, 0.7)], &MarkStore::new())
        .unwrap();
    assert!(!report.calibrated);
    assert_eq!(report.interfaces.first.map(|i| i.raw_position), Some(302));
    assert!(report.readings.is_empty());
}

#[rstest]
fn coincident_marks_fail_loudly(meter: LevelMeter) {
    let mut marks = MarkStore::new();
    marks.click(300);
    marks.click(300);
    let frame = meter.prepare(&synthetic_tube(W, H, &[300]));
    let err = meter
        .process_frame(&frame, &[detection_for_row(300, H, 0.7)], &marks)
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<MeterError>(),
        Some(&MeterError::DegenerateCalibration(300))
    );
}

#[rstest]
fn roi_offset_keeps_full_frame_rows(marks: MarkStore) {
    let meter = LevelMeter::builder()
        .geometry(TubeGeometry::new(6.0, 200.0).unwrap())
        .preparer(FramePreparer {
            rotate_cw: false,
            percent_x: 100,
            percent_y: 50,
        })
        .build()
        .unwrap();
    let frame = meter.prepare(&synthetic_tube(W, H, &[300]));
    assert_eq!(frame.roi.y, 150);
    assert_eq!(frame.image.height(), 300);
    // the band sits at crop row 150; the detector reports crop-normalized boxes
    let report = meter
        .process_frame(&frame, &[detection_for_row(150, 300, 0.9)], &marks)
        .unwrap();
    assert_eq!(report.interfaces.first.map(|i| i.raw_position), Some(302));
}

#[rstest]
fn degenerate_box_is_ignored(meter: LevelMeter, marks: MarkStore) {
    let frame = meter.prepare(&synthetic_tube(W, H, &[300]));
    let flat = RawDetection::new([0.5, 0.3, 0.5, 0.7], 0.9);
    let report = meter.process_frame(&frame, &[flat], &marks).unwrap();
    assert_eq!(report.detected(), 0);
}
