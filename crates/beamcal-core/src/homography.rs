use crate::correspondence::{Correspondence, NUM_POINTS};
use crate::fixed_point::{quantize, scale_factor, to_real, QuantizeError};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Pivots smaller than this fraction of the largest system entry are treated
/// as zero.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Errors returned by the homography solver.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("correspondences are degenerate (collinear or repeated points)")]
    SingularSystem,
    #[error("coefficient h{index} cannot be quantized: {source}")]
    Quantize {
        index: usize,
        #[source]
        source: QuantizeError,
    },
}

/// Real-valued projective map `screen ~ H * device`, normalized so `h33 = 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        let w = v[2];
        Point2::new(v[0] / w, v[1] / w)
    }

    /// Quantize into the driver's fixed-point convention.
    ///
    /// `h1..h8` are rounded with [`quantize`]; `h9` is assigned `10^precision`
    /// outright.
    pub fn quantize(&self, precision: u32) -> Result<HomographyMatrix, SolveError> {
        let scale = scale_factor(precision).map_err(|source| SolveError::Quantize {
            index: 9,
            source,
        })?;

        let mut h = [0_i64; 9];
        for (i, slot) in h.iter_mut().take(8).enumerate() {
            let v = self.h[(i / 3, i % 3)];
            *slot = quantize(v, precision).map_err(|source| SolveError::Quantize {
                index: i + 1,
                source,
            })?;
        }
        h[8] = scale;

        Ok(HomographyMatrix { h })
    }
}

/// Fixed-point homography as consumed by the driver: `h1..h9` in row-major
/// order, every true coefficient scaled by `10^P`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HomographyMatrix {
    pub h: [i64; 9],
}

impl HomographyMatrix {
    pub fn new(h: [i64; 9]) -> Self {
        Self { h }
    }

    /// The identity map at the given precision.
    pub fn identity(precision: u32) -> Result<Self, QuantizeError> {
        let s = scale_factor(precision)?;
        Ok(Self::new([s, 0, 0, 0, s, 0, 0, 0, s]))
    }

    #[inline]
    pub fn coefficients(&self) -> &[i64; 9] {
        &self.h
    }

    /// Scale factor stored in `h9`.
    #[inline]
    pub fn scale(&self) -> i64 {
        self.h[8]
    }

    /// Precision `P` such that `h9 == 10^P`, if `h9` is a power of ten.
    pub fn precision(&self) -> Option<u32> {
        let mut v = self.scale();
        if v <= 0 {
            return None;
        }
        let mut p = 0;
        while v % 10 == 0 {
            v /= 10;
            p += 1;
        }
        (v == 1).then_some(p)
    }

    /// Real-valued matrix, dividing every coefficient by `h9`.
    pub fn to_real(&self) -> Option<Homography> {
        let p = self.precision()?;
        let m = Matrix3::from_row_slice(&self.h.map(|v| to_real(v, p)));
        Some(Homography::new(m))
    }
}

/// Solve for the projective map taking the four device points onto their
/// screen points.
///
/// Unknowns are `[h11 h12 h13 h21 h22 h23 h31 h32]` with `h33 = 1`; each
/// correspondence `(X, Y) -> (x, y)` contributes
/// `h11 X + h12 Y + h13 - x h31 X - x h32 Y = x` and the matching `y` row.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(points)))]
pub fn solve_homography(points: &[Correspondence; NUM_POINTS]) -> Result<Homography, SolveError> {
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for (k, p) in points.iter().enumerate() {
        let dx = f64::from(p.dev_x);
        let dy = f64::from(p.dev_y);
        let sx = f64::from(p.scr_x);
        let sy = f64::from(p.scr_y);

        // row 2k
        let r0 = 2 * k;
        a[(r0, 0)] = dx;
        a[(r0, 1)] = dy;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -dx * sx;
        a[(r0, 7)] = -dy * sx;
        b[r0] = sx;

        // row 2k+1
        let r1 = 2 * k + 1;
        a[(r1, 3)] = dx;
        a[(r1, 4)] = dy;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -dx * sy;
        a[(r1, 7)] = -dy * sy;
        b[r1] = sy;
    }

    let tol = a.amax() * PIVOT_TOLERANCE;
    let lu = a.lu();
    if lu.u().diagonal().iter().any(|d| d.abs() <= tol) {
        return Err(SolveError::SingularSystem);
    }
    let x = lu.solve(&b).ok_or(SolveError::SingularSystem)?;
    if x.iter().any(|v| !v.is_finite()) {
        return Err(SolveError::SingularSystem);
    }

    Ok(Homography::new(Matrix3::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    )))
}

/// Solve and quantize in one step.
pub fn solve_fixed_point(
    points: &[Correspondence; NUM_POINTS],
    precision: u32,
) -> Result<HomographyMatrix, SolveError> {
    let h = solve_homography(points)?.quantize(precision)?;
    log::debug!(
        "computed H matrix:\n[{:>19} ; {:>19} ; {:>19}]\n[{:>19} ; {:>19} ; {:>19}]\n[{:>19} ; {:>19} ; {:>19}]",
        h.h[0],
        h.h[1],
        h.h[2],
        h.h[3],
        h.h[4],
        h.h[5],
        h.h[6],
        h.h[7],
        h.h[8]
    );
    Ok(h)
}
