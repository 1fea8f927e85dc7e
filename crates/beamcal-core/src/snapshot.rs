use crate::homography::HomographyMatrix;
use crate::zone::{ScreenSize, Zone};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// Names of the driver parameters, in the order the driver exposes them.
pub const DRIVER_FIELDS: [&str; 13] = [
    "min_x", "min_y", "max_x", "max_y", "h1", "h2", "h3", "h4", "h5", "h6", "h7", "h8", "h9",
];

/// A finalized calibration: active zone plus fixed-point homography.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationSnapshot {
    pub zone: Zone,
    pub homography: HomographyMatrix,
}

impl CalibrationSnapshot {
    pub fn new(zone: Zone, homography: HomographyMatrix) -> Self {
        Self { zone, homography }
    }

    /// Field-by-field values for the driver, named as in [`DRIVER_FIELDS`].
    pub fn driver_fields(&self) -> [(&'static str, i64); 13] {
        let z = &self.zone;
        let bounds = [z.min_x, z.min_y, z.max_x, z.max_y].map(i64::from);
        let mut values = [0_i64; 13];
        values[..4].copy_from_slice(&bounds);
        values[4..].copy_from_slice(&self.homography.h);

        let mut out = [("", 0_i64); 13];
        for (slot, (name, v)) in out.iter_mut().zip(DRIVER_FIELDS.iter().zip(values)) {
            *slot = (*name, v);
        }
        out
    }

    /// Axis calibration quadruple `[min_x, max_x, min_y, max_y]`.
    pub fn axis_calibration(&self) -> [i32; 4] {
        [
            self.zone.min_x,
            self.zone.max_x,
            self.zone.min_y,
            self.zone.max_y,
        ]
    }

    /// Window-system transform for this calibration on `screen`.
    pub fn transform_matrix(&self, screen: ScreenSize) -> Matrix3<f32> {
        self.zone.transform_matrix(screen)
    }
}
