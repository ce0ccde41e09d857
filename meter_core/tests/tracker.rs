use meter_core::{ByRank, DetectedInterface, order_interfaces};
use rstest::rstest;

fn iface(raw_position: i32, reading: Option<f64>) -> DetectedInterface {
    DetectedInterface {
        raw_position,
        score: 0.5,
        corrected_position: Some(raw_position),
        reading,
    }
}

#[rstest]
#[case::top_ranked_first(iface(200, Some(30.0)), iface(400, Some(10.0)))]
#[case::bottom_ranked_first(iface(400, Some(10.0)), iface(200, Some(30.0)))]
fn topmost_interface_goes_first(#[case] first: DetectedInterface, #[case] second: DetectedInterface) {
    let r = order_interfaces(ByRank::new(Some(&first), Some(&second)));
    assert_eq!(r.top, Some(30.0));
    assert_eq!(r.bottom, Some(10.0));
}

// Characterized quirk: with a reading missing, confidence order is kept and
// positions are ignored.
#[rstest]
fn missing_reading_keeps_rank_order() {
    let first = iface(400, None);
    let second = iface(200, Some(30.0));
    let r = order_interfaces(ByRank::new(Some(&first), Some(&second)));
    assert_eq!(r.top, None);
    assert_eq!(r.bottom, Some(30.0));
}

#[rstest]
fn lone_second_rank_detection_stays_bottom() {
    let second = iface(50, Some(42.0));
    let r = order_interfaces(ByRank::new(None, Some(&second)));
    assert_eq!(r.top, None);
    assert_eq!(r.bottom, Some(42.0));
}

#[rstest]
fn single_detection_is_top() {
    let first = iface(350, Some(12.0));
    let r = order_interfaces(ByRank::new(Some(&first), None));
    assert_eq!(r.top, Some(12.0));
    assert_eq!(r.bottom, None);
}
