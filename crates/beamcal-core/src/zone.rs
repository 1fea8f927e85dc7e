//! Active-zone bookkeeping and target layout.

use nalgebra::{Matrix3, Point2};
use serde::{Deserialize, Serialize};

/// Default number of grid cells per axis used to place targets.
pub const DEFAULT_GRID_BLOCKS: u32 = 8;

/// Names of the four calibration targets, in click order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    UpperLeft,
    LowerLeft,
    UpperRight,
    LowerRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::UpperLeft,
        Corner::LowerLeft,
        Corner::UpperRight,
        Corner::LowerRight,
    ];
}

/// Pixel dimensions of the screen the device is calibrated against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    #[error("screen size must be non-zero, got {width}x{height}")]
    EmptyScreen { width: u32, height: u32 },
    #[error("zone bounds are inverted: x {min_x}..{max_x}, y {min_y}..{max_y}")]
    InvertedBounds {
        min_x: i32,
        min_y: i32,
        max_x: i32,
        max_y: i32,
    },
}

/// Rectangular screen region the calibration targets.
///
/// `zoned == false` means the zone spans the full screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zone {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
    pub zoned: bool,
}

fn screen_extent(v: u32) -> i32 {
    i32::try_from(v).map_or(i32::MAX, |v| v - 1)
}

fn clamp_to(v: i64, lo: i32, hi: i32) -> i32 {
    // Clamped into [lo, hi], so the cast is lossless.
    v.clamp(i64::from(lo), i64::from(hi)) as i32
}

impl Zone {
    /// Zone covering the whole screen.
    pub fn full_screen(screen: ScreenSize) -> Result<Self, ZoneError> {
        if screen.width == 0 || screen.height == 0 {
            return Err(ZoneError::EmptyScreen {
                width: screen.width,
                height: screen.height,
            });
        }
        Ok(Self {
            min_x: 0,
            min_y: 0,
            max_x: screen_extent(screen.width),
            max_y: screen_extent(screen.height),
            zoned: false,
        })
    }

    /// Build a zone from explicit bounds, deriving `zoned` against `screen`.
    pub fn from_bounds(
        min_x: i32,
        min_y: i32,
        max_x: i32,
        max_y: i32,
        screen: ScreenSize,
    ) -> Result<Self, ZoneError> {
        if min_x > max_x || min_y > max_y {
            return Err(ZoneError::InvertedBounds {
                min_x,
                min_y,
                max_x,
                max_y,
            });
        }
        let mut zone = Self {
            min_x,
            min_y,
            max_x,
            max_y,
            zoned: true,
        };
        zone.rederive_zoned(screen);
        Ok(zone)
    }

    /// Resolve optional `[min_x, min_y, max_x, max_y]` bounds.
    ///
    /// Missing or all-zero bounds select the full screen.
    pub fn resolve(bounds: Option<[i32; 4]>, screen: ScreenSize) -> Result<Self, ZoneError> {
        match bounds {
            Some([min_x, min_y, max_x, max_y]) if bounds != Some([0; 4]) => {
                if screen.width == 0 || screen.height == 0 {
                    return Err(ZoneError::EmptyScreen {
                        width: screen.width,
                        height: screen.height,
                    });
                }
                Self::from_bounds(min_x, min_y, max_x, max_y, screen)
            }
            _ => Self::full_screen(screen),
        }
    }

    /// Recompute `zoned`: false iff the bounds are exactly the screen extents.
    pub fn rederive_zoned(&mut self, screen: ScreenSize) {
        self.zoned = !(self.min_x == 0
            && self.min_y == 0
            && self.max_x == screen_extent(screen.width)
            && self.max_y == screen_extent(screen.height));
    }

    /// Horizontal extent in pixels, bounds inclusive.
    #[inline]
    pub fn width(&self) -> i64 {
        i64::from(self.max_x) - i64::from(self.min_x) + 1
    }

    /// Vertical extent in pixels, bounds inclusive.
    #[inline]
    pub fn height(&self) -> i64 {
        i64::from(self.max_y) - i64::from(self.min_y) + 1
    }

    /// Screen position of one target on a `blocks x blocks` grid.
    ///
    /// Offsets are computed in `i64` and the result is clamped to the zone,
    /// so extreme bounds never overflow. With `blocks < 2` the targets
    /// collapse onto the zone edges.
    pub fn target(&self, corner: Corner, blocks: u32) -> Point2<i32> {
        let blocks = i64::from(blocks.max(1));
        let dx = self.width() / blocks;
        let dy = self.height() / blocks;
        let left = clamp_to(i64::from(self.min_x) + dx, self.min_x, self.max_x);
        let right = clamp_to(i64::from(self.max_x) - dx, self.min_x, self.max_x);
        let top = clamp_to(i64::from(self.min_y) + dy, self.min_y, self.max_y);
        let bottom = clamp_to(i64::from(self.max_y) - dy, self.min_y, self.max_y);
        match corner {
            Corner::UpperLeft => Point2::new(left, top),
            Corner::LowerLeft => Point2::new(left, bottom),
            Corner::UpperRight => Point2::new(right, top),
            Corner::LowerRight => Point2::new(right, bottom),
        }
    }

    /// The four targets at the inner corners of the grid, in click order
    /// (upper-left, lower-left, upper-right, lower-right).
    pub fn targets(&self, blocks: u32) -> [Point2<i32>; 4] {
        Corner::ALL.map(|c| self.target(c, blocks))
    }

    /// Window-system coordinate transform placing the full device range onto
    /// this zone. Identity when the zone is the full screen.
    pub fn transform_matrix(&self, screen: ScreenSize) -> Matrix3<f32> {
        if !self.zoned || screen.width == 0 || screen.height == 0 {
            return transform_matrix_identity();
        }
        let sw = screen.width as f32;
        let sh = screen.height as f32;
        Matrix3::new(
            self.width() as f32 / sw,
            0.0,
            self.min_x as f32 / sw,
            0.0,
            self.height() as f32 / sh,
            self.min_y as f32 / sh,
            0.0,
            0.0,
            1.0,
        )
    }
}

/// The transform a window system uses for an uncalibrated device.
pub fn transform_matrix_identity() -> Matrix3<f32> {
    Matrix3::identity()
}
