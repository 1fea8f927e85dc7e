use crate::fixed_point::{scale_factor, DEFAULT_PRECISION, RECOMMENDED_PRECISION};
use crate::zone::DEFAULT_GRID_BLOCKS;
use serde::{Deserialize, Serialize};

/// eBeam devices report unstable samples; repeats within this many device
/// units of an accepted click are dropped.
pub const DEFAULT_DOUBLE_CLICK_THRESHOLD: u32 = 16;

fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

fn default_threshold() -> u32 {
    DEFAULT_DOUBLE_CLICK_THRESHOLD
}

fn default_grid_blocks() -> u32 {
    DEFAULT_GRID_BLOCKS
}

/// Tunables of a calibration run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// Coefficients are stored as `round(v * 10^precision)`.
    ///
    /// Below 9 the replayed screen positions lose accuracy, above 14 the
    /// driver's `coefficient * sample` products may overflow.
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Mis-click threshold in device units; `0` disables the check.
    #[serde(default = "default_threshold")]
    pub double_click_threshold: u32,
    /// Grid resolution used to place the four targets.
    #[serde(default = "default_grid_blocks")]
    pub grid_blocks: u32,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            double_click_threshold: DEFAULT_DOUBLE_CLICK_THRESHOLD,
            grid_blocks: DEFAULT_GRID_BLOCKS,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    #[error("precision {0} overflows a 64-bit scale factor (max 18)")]
    PrecisionTooLarge(u32),
    #[error("grid_blocks must be >= 2, got {0}")]
    InvalidGridBlocks(u32),
}

impl CalibrationParams {
    /// Check the parameters, warning when precision leaves the safe window.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if scale_factor(self.precision).is_err() {
            return Err(ParamsError::PrecisionTooLarge(self.precision));
        }
        if self.grid_blocks < 2 {
            return Err(ParamsError::InvalidGridBlocks(self.grid_blocks));
        }
        if !RECOMMENDED_PRECISION.contains(&self.precision) {
            log::warn!(
                "precision {} is outside the recommended {}..={} range",
                self.precision,
                RECOMMENDED_PRECISION.start(),
                RECOMMENDED_PRECISION.end()
            );
        }
        Ok(())
    }
}
