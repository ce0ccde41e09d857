//! Labels the (up to) two interfaces of a frame as top and bottom.

use crate::detection::ByRank;

/// One detected interface of the current frame. Not carried across frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedInterface {
    /// Full-frame row of the lower meniscus edge.
    pub raw_position: i32,
    pub score: f32,
    /// Row after lens and parallax correction; `None` without calibration.
    pub corrected_position: Option<i32>,
    pub reading: Option<f64>,
}

/// Readings as published: interface 1 (top) and interface 2 (bottom).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InterfaceReadings {
    pub top: Option<f64>,
    pub bottom: Option<f64>,
}

impl InterfaceReadings {
    pub const EMPTY: Self = Self {
        top: None,
        bottom: None,
    };

    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.bottom.is_none()
    }
}

fn reading_of(slot: Option<&DetectedInterface>) -> Option<f64> {
    slot.and_then(|i| i.reading)
}

/// Assign readings to the top and bottom slots.
///
/// With both readings present the interface at the smaller row (higher in
/// the image) is the top one. Equal rows keep confidence order: the
/// best-scored interface is top.
///
/// If either reading is absent, readings stay in confidence-rank order and
/// positions are ignored. A lone second-rank reading therefore lands in the
/// bottom slot even when it sits above everything else.
pub fn order_interfaces(interfaces: ByRank<Option<&DetectedInterface>>) -> InterfaceReadings {
    let first = reading_of(interfaces.first);
    let second = reading_of(interfaces.second);
    match (interfaces.first, interfaces.second, first, second) {
        (Some(a), Some(b), Some(ra), Some(rb)) => {
            if b.raw_position < a.raw_position {
                InterfaceReadings {
                    top: Some(rb),
                    bottom: Some(ra),
                }
            } else {
                InterfaceReadings {
                    top: Some(ra),
                    bottom: Some(rb),
                }
            }
        }
        _ => InterfaceReadings {
            top: first,
            bottom: second,
        },
    }
}
