use std::fs::File;
use std::io::Write;

use meter_config::{MarkRow, load_marks_csv, save_marks_csv};
use rstest::rstest;
use tempfile::tempdir;

fn write(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("marks.csv");
    let mut f = File::create(&path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    path
}

#[rstest]
fn loads_two_marks_in_order() {
    let dir = tempdir().unwrap();
    let path = write(&dir, "pixel,capacity\n500,0.0\n100,50.0\n");
    let [min, max] = load_marks_csv(&path).unwrap();
    assert_eq!(min.pixel, 500);
    assert_eq!(max.pixel, 100);
    assert!((max.capacity - 50.0).abs() < 1e-12);
}

#[rstest]
fn tolerates_whitespace_around_fields() {
    let dir = tempdir().unwrap();
    let path = write(&dir, "pixel, capacity\n 500 , 0\n100,50\n");
    let [min, _] = load_marks_csv(&path).unwrap();
    assert_eq!(min.pixel, 500);
}

#[rstest]
#[case("pos,capacity\n500,0\n100,50\n", "headers 'pixel,capacity'")]
#[case("pixel,capacity\n500,0\n", "exactly two rows, got 1")]
#[case("pixel,capacity\n500,0\n100,50\n300,25\n", "exactly two rows, got 3")]
#[case("pixel,capacity\n500,0\n500,50\n", "must be distinct")]
#[case("pixel,capacity\n500,zero\n100,50\n", "invalid CSV row 2")]
fn rejects_bad_files(#[case] body: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = write(&dir, body);
    let err = load_marks_csv(&path).expect_err("should fail");
    assert!(format!("{err}").contains(needle), "expected {needle:?} in {err}");
}

#[rstest]
fn save_then_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("saved.csv");
    let rows = [
        MarkRow {
            pixel: 620,
            capacity: 10.0,
        },
        MarkRow {
            pixel: 80,
            capacity: 100.0,
        },
    ];
    save_marks_csv(&path, &rows).unwrap();
    assert_eq!(load_marks_csv(&path).unwrap(), rows);
}
