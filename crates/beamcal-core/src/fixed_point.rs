//! Fixed-point conventions shared by the solver and the replay validator.
//!
//! The kernel driver stores every homography coefficient as `round(v * 10^P)`
//! in a signed 64-bit integer and only ever does integer math on them. The
//! helpers here pin down that convention: half-away-from-zero rounding on the
//! way in, truncating division on the way out.

/// Default number of decimal digits kept per coefficient.
pub const DEFAULT_PRECISION: u32 = 12;

/// Precision window in which quantized fits are both accurate and safe from
/// overflow in `coefficient * raw_sample` products.
///
/// The solve itself runs in `f64`, so past P = 14 the extra digits of a
/// coefficient in the thousands are rounding noise from the solver.
pub const RECOMMENDED_PRECISION: std::ops::RangeInclusive<u32> = 9..=14;

/// Errors raised while converting real coefficients to fixed point.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum QuantizeError {
    #[error("precision {0} does not fit a 64-bit scale factor")]
    PrecisionOutOfRange(u32),
    #[error("coefficient {value} is not representable at precision {precision}")]
    NotRepresentable { value: f64, precision: u32 },
}

/// `10^precision` as an `i64`.
pub fn scale_factor(precision: u32) -> Result<i64, QuantizeError> {
    10_i64
        .checked_pow(precision)
        .ok_or(QuantizeError::PrecisionOutOfRange(precision))
}

/// Quantize `value` to `round(value * 10^precision)`, rounding half away
/// from zero.
///
/// The integer part is scaled in `i64` and only the fraction goes through
/// `f64`, so digits beyond 2^53 are kept for large coefficients such as the
/// offset terms at P >= 13. Any other rounding mode drifts from what the
/// driver expects.
pub fn quantize(value: f64, precision: u32) -> Result<i64, QuantizeError> {
    let scale = scale_factor(precision)?;
    let not_representable = || QuantizeError::NotRepresentable { value, precision };
    if !value.is_finite() {
        return Err(not_representable());
    }

    // i64::MAX is not exactly representable; 2^63 is the first value out of range.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let whole = value.trunc();
    if whole >= LIMIT || whole < -LIMIT {
        return Err(not_representable());
    }
    // |fract| < 1 and scale <= 10^18, so the product stays inside i64.
    let frac = (value.fract() * scale as f64).round() as i64;

    (whole as i64)
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(not_representable)
}

/// Convert a fixed-point coefficient back to its real value.
pub fn to_real(value: i64, precision: u32) -> f64 {
    value as f64 / 10_f64.powi(precision as i32)
}

/// Integer division truncating toward zero, as the driver's C code does.
///
/// Returns `None` on a zero divisor or on `i64::MIN / -1`.
#[inline]
pub fn div_trunc(numerator: i64, denominator: i64) -> Option<i64> {
    numerator.checked_div(denominator)
}

/// Integer rounding of `numerator / denominator` the way the driver does it:
/// `(2 * num + den) / (2 * den)` with truncating division.
///
/// This is *not* round-half-away-from-zero for negative quotients; it has to
/// reproduce the driver bit for bit, quirks included. Returns `None` on a
/// zero denominator or on overflow.
pub fn driver_round_div(numerator: i64, denominator: i64) -> Option<i64> {
    if denominator == 0 {
        return None;
    }
    let num2 = numerator.checked_mul(2)?.checked_add(denominator)?;
    let den2 = denominator.checked_mul(2)?;
    div_trunc(num2, den2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_factor_covers_i64_range() {
        assert_eq!(scale_factor(0), Ok(1));
        assert_eq!(scale_factor(12), Ok(1_000_000_000_000));
        assert_eq!(scale_factor(18), Ok(1_000_000_000_000_000_000));
        assert_eq!(
            scale_factor(19),
            Err(QuantizeError::PrecisionOutOfRange(19))
        );
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(quantize(0.25, 1), Ok(3));
        assert_eq!(quantize(-0.25, 1), Ok(-3));
        assert_eq!(quantize(0.5, 0), Ok(1));
        assert_eq!(quantize(-0.5, 0), Ok(-1));
        assert_eq!(quantize(1.5, 0), Ok(2));
        assert_eq!(quantize(2.5, 0), Ok(3));
        assert_eq!(quantize(-2.5, 0), Ok(-3));
        assert_eq!(quantize(0.0, 12), Ok(0));
        assert_eq!(quantize(-0.0, 12), Ok(0));
    }

    #[test]
    fn quantizes_at_default_precision() {
        assert_eq!(quantize(1.0, DEFAULT_PRECISION), Ok(1_000_000_000_000));
        assert_eq!(quantize(0.8, DEFAULT_PRECISION), Ok(800_000_000_000));
        assert_eq!(quantize(-100.0, DEFAULT_PRECISION), Ok(-100_000_000_000_000));
        // Tiny residuals of an exact fit collapse to zero.
        assert_eq!(quantize(3.0e-17, DEFAULT_PRECISION), Ok(0));
        assert_eq!(quantize(-3.0e-17, DEFAULT_PRECISION), Ok(0));
    }

    #[test]
    fn keeps_digits_beyond_f64_mantissa() {
        // 1920 + 2^-20 is exact in f64; v * 10^14 is not (spacing 32 at 1.9e17).
        let v = 1920.0 + 2.0_f64.powi(-20);
        assert_eq!(quantize(v, 14), Ok(192_000_000_095_367_432));
        assert_eq!(quantize(-v, 14), Ok(-192_000_000_095_367_432));
        assert_eq!(quantize(1920.5, 14), Ok(192_050_000_000_000_000));
    }

    #[test]
    fn rejects_unrepresentable_values() {
        assert!(matches!(
            quantize(f64::NAN, 12),
            Err(QuantizeError::NotRepresentable { .. })
        ));
        assert!(matches!(
            quantize(1.0e8, 12),
            Err(QuantizeError::NotRepresentable { .. })
        ));
        assert!(matches!(
            quantize(f64::INFINITY, 12),
            Err(QuantizeError::NotRepresentable { .. })
        ));
        assert!(matches!(
            quantize(-1.0e19, 0),
            Err(QuantizeError::NotRepresentable { .. })
        ));
        assert!(matches!(
            quantize(1.0, 20),
            Err(QuantizeError::PrecisionOutOfRange(20))
        ));
    }

    #[test]
    fn to_real_inverts_scaling() {
        assert_eq!(to_real(800_000_000_000, 12), 0.8);
        assert_eq!(to_real(-5, 0), -5.0);
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(div_trunc(7, 2), Some(3));
        assert_eq!(div_trunc(-7, 2), Some(-3));
        assert_eq!(div_trunc(7, -2), Some(-3));
        assert_eq!(div_trunc(-7, -2), Some(3));
        assert_eq!(div_trunc(1, 0), None);
        assert_eq!(div_trunc(i64::MIN, -1), None);
    }

    #[test]
    fn driver_rounding_matches_kernel_formula() {
        // 7/2 = 3.5 -> (14 + 2) / 4 = 4
        assert_eq!(driver_round_div(7, 2), Some(4));
        // 5/4 = 1.25 -> (10 + 4) / 8 = 1
        assert_eq!(driver_round_div(5, 4), Some(1));
        // -5/4 = -1.25 -> (-10 + 4) / 8 = 0 with truncation (floor would give -1)
        assert_eq!(driver_round_div(-5, 4), Some(0));
        // -7/2 = -3.5 -> (-14 + 2) / 4 = -3
        assert_eq!(driver_round_div(-7, 2), Some(-3));
        assert_eq!(driver_round_div(1, 0), None);
        assert_eq!(driver_round_div(i64::MAX, 1), None);
    }
}
