//! Meniscus lower-edge localization on a binarized detection patch.
//!
//! A window of adjacent columns around the patch center is scanned and the
//! lowest foreground row of each column is averaged. Averaging several columns
//! keeps the reported edge from jittering when a single column flickers with
//! illumination changes.

use image::GrayImage;

/// Pixel value treated as foreground in the binarized patch.
pub const FOREGROUND: u8 = 255;
/// Default number of averaged columns.
pub const DEFAULT_COLUMNS: usize = 5;

/// What a window column without any foreground pixel contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyColumnPolicy {
    /// Counts as row 0 of the patch. This biases the edge upwards when the
    /// window catches background, and matches the readings users have
    /// historically recorded.
    #[default]
    ZeroFill,
    /// Left out of the average. If every column is empty there is no edge.
    Exclude,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeLocalizer {
    columns: usize,
    policy: EmptyColumnPolicy,
}

impl Default for EdgeLocalizer {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            policy: EmptyColumnPolicy::ZeroFill,
        }
    }
}

impl EdgeLocalizer {
    /// `columns` is clamped to at least 1.
    pub fn new(columns: usize, policy: EmptyColumnPolicy) -> Self {
        Self {
            columns: columns.max(1),
            policy,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn policy(&self) -> EmptyColumnPolicy {
        self.policy
    }

    /// First column of the averaging window for a patch of `width`.
    fn window_start(&self, width: u32) -> u32 {
        let half = u32::try_from(self.columns / 2).unwrap_or(u32::MAX);
        (width / 2).saturating_sub(half)
    }

    /// Lowest foreground row of column `x`, if any.
    fn lowest_foreground(patch: &GrayImage, x: u32) -> Option<u32> {
        (0..patch.height())
            .rev()
            .find(|&y| patch.get_pixel(x, y)[0] == FOREGROUND)
    }

    /// Full-frame row of the meniscus lower edge.
    ///
    /// `y_offset` is the frame row of the patch's top edge. Window columns that
    /// fall outside a narrow patch count as empty. Returns `None` for a
    /// zero-sized patch, or under [`EmptyColumnPolicy::Exclude`] when no window
    /// column holds foreground.
    pub fn lower_edge(&self, patch: &GrayImage, y_offset: i32) -> Option<i32> {
        let (width, height) = patch.dimensions();
        if width == 0 || height == 0 {
            return None;
        }

        let start = self.window_start(width);
        let mut sum: u64 = 0;
        let mut counted: u64 = 0;
        for i in 0..self.columns {
            let hit = u32::try_from(i)
                .ok()
                .and_then(|i| start.checked_add(i))
                .filter(|&x| x < width)
                .and_then(|x| Self::lowest_foreground(patch, x));
            match (hit, self.policy) {
                (Some(row), _) => {
                    sum += u64::from(row);
                    counted += 1;
                }
                (None, EmptyColumnPolicy::ZeroFill) => counted += 1,
                (None, EmptyColumnPolicy::Exclude) => {}
            }
        }
        if counted == 0 {
            return None;
        }
        let avg = i32::try_from(sum / counted).ok()?;
        Some(y_offset.saturating_add(avg))
    }
}
