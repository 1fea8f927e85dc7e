use serde::{Deserialize, Serialize};

/// Number of correspondences a calibration run needs.
pub const NUM_POINTS: usize = 4;

/// One device sample paired with the screen target it was meant to hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Correspondence {
    pub dev_x: i32,
    pub dev_y: i32,
    pub scr_x: i32,
    pub scr_y: i32,
}

impl Correspondence {
    pub fn new(dev_x: i32, dev_y: i32, scr_x: i32, scr_y: i32) -> Self {
        Self {
            dev_x,
            dev_y,
            scr_x,
            scr_y,
        }
    }

    /// True when `(dev_x, dev_y)` lies within `threshold` device units of
    /// this sample on both axes.
    #[inline]
    pub fn is_near(&self, dev_x: i32, dev_y: i32, threshold: u32) -> bool {
        (i64::from(dev_x) - i64::from(self.dev_x)).unsigned_abs() <= u64::from(threshold)
            && (i64::from(dev_y) - i64::from(self.dev_y)).unsigned_abs() <= u64::from(threshold)
    }
}

/// Append-only set of up to [`NUM_POINTS`] correspondences.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CorrespondenceSet {
    points: Vec<Correspondence>,
}

impl CorrespondenceSet {
    pub fn new() -> Self {
        Self {
            points: Vec::with_capacity(NUM_POINTS),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.points.len() == NUM_POINTS
    }

    /// Append a correspondence. Returns `false` if the set is already full.
    pub fn push(&mut self, point: Correspondence) -> bool {
        if self.is_full() {
            return false;
        }
        self.points.push(point);
        true
    }

    /// First accepted point within `threshold` of `(dev_x, dev_y)`.
    pub fn find_near(&self, dev_x: i32, dev_y: i32, threshold: u32) -> Option<&Correspondence> {
        self.points
            .iter()
            .find(|p| p.is_near(dev_x, dev_y, threshold))
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn as_slice(&self) -> &[Correspondence] {
        &self.points
    }

    /// The four points as a fixed array, once the set is full.
    pub fn as_array(&self) -> Option<&[Correspondence; NUM_POINTS]> {
        self.points.as_slice().try_into().ok()
    }
}
