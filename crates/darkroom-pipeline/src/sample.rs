//! Channel sample helpers shared by every stage.
//!
//! Samples are `f64` while a stage computes and `u8` once stored.

/// Clamp a sample to the 8-bit range.
#[must_use]
pub(crate) fn clamp(v: f64) -> f64 {
    v.clamp(0.0, 255.0)
}

/// Round a sample and store it as `u8`.
///
/// Ties round to even, matching clamped 8-bit canvas storage. Values
/// outside `[0, 255]` saturate and NaN stores as 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn store(v: f64) -> u8 {
    v.round_ties_even() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bounds() {
        assert!(clamp(-0.5).abs() < f64::EPSILON);
        assert!((clamp(255.5) - 255.0).abs() < f64::EPSILON);
        assert!((clamp(17.25) - 17.25).abs() < f64::EPSILON);
    }

    #[test]
    fn store_saturates_out_of_range() {
        assert_eq!(store(-20.0), 0);
        assert_eq!(store(300.0), 255);
        assert_eq!(store(f64::NAN), 0);
    }

    #[test]
    fn store_rounds_ties_to_even() {
        assert_eq!(store(2.5), 2);
        assert_eq!(store(3.5), 4);
        assert_eq!(store(254.5), 254);
        assert_eq!(store(2.500_001), 3);
    }
}
