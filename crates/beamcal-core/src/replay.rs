//! Integer replay of the driver's coordinate mapping.
//!
//! The driver computes, for a raw sample `(X, Y)`:
//!
//! ```text
//! scale = h7*X + h8*Y + h9
//! x = (2*(h1*X + h2*Y + h3) + scale) / (2*scale)
//! y = (2*(h4*X + h5*Y + h6) + scale) / (2*scale)
//! ```
//!
//! with 64-bit signed operands and truncating division. A quantized matrix is
//! only accepted when this exact arithmetic lands every calibration sample
//! back on its screen target.

use crate::correspondence::Correspondence;
use crate::fixed_point::driver_round_div;
use crate::homography::HomographyMatrix;

/// Reasons a quantized matrix is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("division by zero replaying point {point}")]
    DegenerateMatrix { point: usize },
    #[error("point {point}: expected screen {expected:?}, driver would report {replayed:?}")]
    ValidationMismatch {
        point: usize,
        expected: (i32, i32),
        replayed: (i64, i64),
    },
    #[error("64-bit overflow replaying point {point}")]
    Overflow { point: usize },
}

/// Outcome of mapping one raw sample through the driver formula.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Replayed {
    Point { x: i64, y: i64 },
    ZeroDenominator,
    Overflow,
}

fn dot(a: i64, b: i64, c: i64, x: i64, y: i64) -> Option<i64> {
    a.checked_mul(x)?
        .checked_add(b.checked_mul(y)?)?
        .checked_add(c)
}

/// Map a raw device sample to screen coordinates exactly as the driver does.
pub fn replay_point(h: &HomographyMatrix, dev_x: i32, dev_y: i32) -> Replayed {
    let [h1, h2, h3, h4, h5, h6, h7, h8, h9] = h.h;
    let x = i64::from(dev_x);
    let y = i64::from(dev_y);

    let Some(scale) = dot(h7, h8, h9, x, y) else {
        return Replayed::Overflow;
    };
    if scale == 0 {
        return Replayed::ZeroDenominator;
    }

    let mapped = dot(h1, h2, h3, x, y)
        .and_then(|n| driver_round_div(n, scale))
        .zip(dot(h4, h5, h6, x, y).and_then(|n| driver_round_div(n, scale)));

    match mapped {
        Some((x, y)) => Replayed::Point { x, y },
        None => Replayed::Overflow,
    }
}

/// Check that every correspondence survives the driver's integer mapping.
pub fn validate(h: &HomographyMatrix, points: &[Correspondence]) -> Result<(), ReplayError> {
    for (i, p) in points.iter().enumerate() {
        let point = i + 1;
        match replay_point(h, p.dev_x, p.dev_y) {
            Replayed::ZeroDenominator => return Err(ReplayError::DegenerateMatrix { point }),
            Replayed::Overflow => return Err(ReplayError::Overflow { point }),
            Replayed::Point { x, y } => {
                if x != i64::from(p.scr_x) || y != i64::from(p.scr_y) {
                    log::warn!(
                        "bad H matrix: point {point} dev({} ; {}) => scr({x} ; {y}), real({} ; {})",
                        p.dev_x,
                        p.dev_y,
                        p.scr_x,
                        p.scr_y
                    );
                    return Err(ReplayError::ValidationMismatch {
                        point,
                        expected: (p.scr_x, p.scr_y),
                        replayed: (x, y),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: i64 = 1_000_000_000_000;

    fn scale_offset() -> HomographyMatrix {
        // x = 0.8 X + 100, y = 0.8 Y + 100
        HomographyMatrix::new([
            800_000_000_000,
            0,
            100 * S,
            0,
            800_000_000_000,
            100 * S,
            0,
            0,
            S,
        ])
    }

    #[test]
    fn identity_replays_non_negative_samples_exactly() {
        let h = HomographyMatrix::identity(12).expect("identity");
        assert_eq!(replay_point(&h, 640, 480), Replayed::Point { x: 640, y: 480 });
        assert_eq!(replay_point(&h, 0, 7), Replayed::Point { x: 0, y: 7 });
        // Driver rounding truncates toward zero: (2 * -3S + S) / 2S = -5/2 -> -2.
        assert_eq!(replay_point(&h, -3, 7), Replayed::Point { x: -2, y: 7 });
    }

    #[test]
    fn scale_offset_rounds_like_the_driver() {
        let h = scale_offset();
        assert_eq!(replay_point(&h, 125, 875), Replayed::Point { x: 200, y: 800 });
        // 0.8 * 1 + 100 = 100.8 -> 101
        assert_eq!(replay_point(&h, 1, 1), Replayed::Point { x: 101, y: 101 });
        // 0.8 * 3 + 100 = 102.4 -> 102
        assert_eq!(replay_point(&h, 3, 3), Replayed::Point { x: 102, y: 102 });
    }

    #[test]
    fn negative_results_truncate_toward_zero() {
        // x = -X, so X = 1 gives -1: (2 * -S + S) / (2 * S) = -S / 2S -> 0 with truncation.
        let h = HomographyMatrix::new([-S, 0, 0, 0, S, 0, 0, 0, S]);
        assert_eq!(replay_point(&h, 1, 0), Replayed::Point { x: 0, y: 0 });
        assert_eq!(replay_point(&h, 2, 0), Replayed::Point { x: -1, y: 0 });
    }

    #[test]
    fn zero_denominator_is_degenerate() {
        let h = HomographyMatrix::new([S, 0, 0, 0, S, 0, -S, 0, 10 * S]);
        assert_eq!(replay_point(&h, 10, 0), Replayed::ZeroDenominator);
        let pts = [Correspondence::new(10, 0, 10, 0)];
        assert_eq!(
            validate(&h, &pts),
            Err(ReplayError::DegenerateMatrix { point: 1 })
        );
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let h = HomographyMatrix::new([i64::MAX / 2, 0, 0, 0, S, 0, 0, 0, S]);
        assert_eq!(replay_point(&h, 4, 0), Replayed::Overflow);
        let pts = [Correspondence::new(4, 0, 0, 0)];
        assert_eq!(validate(&h, &pts), Err(ReplayError::Overflow { point: 1 }));
    }

    #[test]
    fn mismatch_names_the_failing_point() {
        let h = scale_offset();
        let pts = [
            Correspondence::new(125, 125, 200, 200),
            Correspondence::new(125, 875, 200, 801),
        ];
        assert_eq!(
            validate(&h, &pts),
            Err(ReplayError::ValidationMismatch {
                point: 2,
                expected: (200, 801),
                replayed: (200, 800),
            })
        );
    }

    #[test]
    fn validate_accepts_exact_fit() {
        let h = scale_offset();
        let pts = [
            Correspondence::new(125, 125, 200, 200),
            Correspondence::new(125, 875, 200, 800),
            Correspondence::new(875, 125, 800, 200),
            Correspondence::new(875, 875, 800, 800),
        ];
        assert_eq!(validate(&h, &pts), Ok(()));
    }
}
