use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use meter_core::mocks::{detection_for_row, synthetic_tube};
use meter_core::preprocess::Binarizer;
use meter_core::{
    ByRank, EdgeLocalizer, FramePreparer, LevelMeter, MarkPair, PlacedMark, TubeGeometry,
};

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

fn marks() -> MarkPair {
    MarkPair::new(
        PlacedMark {
            pixel: 1100,
            capacity: 0.0,
        },
        PlacedMark {
            pixel: 100,
            capacity: 50.0,
        },
    )
    .unwrap()
}

fn bench_binarize(c: &mut Criterion) {
    let frame = synthetic_tube(720, 1280, &[400, 900]);
    let binarizer = Binarizer::default();
    c.bench_function("binarize_720x1280", |b| {
        b.iter(|| black_box(binarizer.binarize(black_box(&frame))))
    });
}

fn bench_edge(c: &mut Criterion) {
    let frame = synthetic_tube(720, 1280, &[400]);
    let binary = Binarizer::default().binarize(&frame);
    let bbox = meter_core::detection::to_pixel_box(&detection_for_row(400, 1280, 0.9), 720, 1280)
        .unwrap();
    let patch = binary.patch(&bbox);
    let edge = EdgeLocalizer::default();
    c.bench_function("lower_edge_patch", |b| {
        b.iter(|| black_box(edge.lower_edge(black_box(&patch), 385)))
    });
}

fn bench_measure_rows(c: &mut Criterion) {
    let meter = meter();
    let pair = marks();
    c.bench_function("measure_rows_two_interfaces", |b| {
        b.iter_batched(
            || ByRank::new(Some((401, 0.9)), Some((901, 0.8))),
            |rows| black_box(meter.measure_rows(rows, Some(&pair))),
            BatchSize::SmallInput,
        )
    });
}

fn bench_full_frame(c: &mut Criterion) {
    let meter = meter();
    let raw = synthetic_tube(720, 1280, &[400, 900]);
    let detections = [
        detection_for_row(400, 1280, 0.9),
        detection_for_row(900, 1280, 0.8),
    ];
    let pair = marks();
    c.bench_function("measure_full_frame", |b| {
        b.iter(|| {
            let frame = meter.prepare(&raw);
            black_box(meter.measure(&frame, &detections, Some(&pair)))
        })
    });
}

criterion_group!(
    benches,
    bench_binarize,
    bench_edge,
    bench_measure_rows,
    bench_full_frame
);
criterion_main!(benches);
