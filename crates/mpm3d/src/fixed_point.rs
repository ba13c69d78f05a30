//! Fixed-point encoding for order-independent grid accumulation.
//!
//! Floating-point addition is not associative, so concurrent scatter into the
//! same grid node would give results that depend on scheduling. Contributions
//! are instead scaled by an integer multiplier, rounded to `i32`, and added with
//! an atomic integer add:
//!   f32 * multiplier → i32 (scatter), then i32 / multiplier → f32 (read back)
//!
//! Larger multipliers keep more precision but shrink the representable range
//! to `±i32::MAX / multiplier`. Encoding saturates at the range limits.

use std::sync::atomic::{AtomicI32, Ordering};

use crate::constants::FIXED_POINT_MULTIPLIER;

/// Scale/descale pair for fixed-point accumulators.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedPoint {
    multiplier: f32,
}

impl FixedPoint {
    /// Create an encoding with the given multiplier.
    pub fn new(multiplier: f32) -> Self {
        assert!(
            multiplier.is_finite() && multiplier > 0.0,
            "fixed-point multiplier must be positive, got {}",
            multiplier
        );
        Self { multiplier }
    }

    /// The integer multiplier.
    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    /// Largest magnitude that encodes without saturating.
    pub fn max_magnitude(&self) -> f32 {
        i32::MAX as f32 / self.multiplier
    }

    /// Smallest non-zero step the encoding can represent.
    pub fn resolution(&self) -> f32 {
        1.0 / self.multiplier
    }

    /// `round(x * multiplier)`, saturating at the `i32` range.
    #[inline]
    pub fn encode(&self, x: f32) -> i32 {
        // `as` saturates on overflow and maps NaN to 0
        (x * self.multiplier).round() as i32
    }

    /// `i / multiplier`
    #[inline]
    pub fn decode(&self, i: i32) -> f32 {
        i as f32 / self.multiplier
    }

    /// Encode `x` and add it to `target`.
    #[inline]
    pub fn atomic_add(&self, target: &AtomicI32, x: f32) {
        target.fetch_add(self.encode(x), Ordering::Relaxed);
    }

    /// Read an accumulator and decode it.
    #[inline]
    pub fn load(&self, source: &AtomicI32) -> f32 {
        self.decode(source.load(Ordering::Relaxed))
    }
}

impl Default for FixedPoint {
    fn default() -> Self {
        Self::new(FIXED_POINT_MULTIPLIER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_rounds_to_nearest() {
        let fp = FixedPoint::new(10.0);
        assert_eq!(fp.encode(0.14), 1);
        assert_eq!(fp.encode(0.15), 2);
        assert_eq!(fp.encode(-0.15), -2);
        assert_eq!(fp.encode(0.0), 0);
    }

    #[test]
    fn test_decode_inverts_encode_within_resolution() {
        let fp = FixedPoint::default();
        for x in [0.0, 1.0, -3.25, 0.123_456, 42.5] {
            let back = fp.decode(fp.encode(x));
            assert!(
                (back - x).abs() <= fp.resolution() * 4.0 + x.abs() * 1e-6,
                "x={} decoded to {}",
                x,
                back
            );
        }
    }

    #[test]
    fn test_encode_saturates() {
        let fp = FixedPoint::new(1.0e7);
        assert_eq!(fp.encode(1.0e6), i32::MAX);
        assert_eq!(fp.encode(-1.0e6), i32::MIN);
        assert_eq!(fp.encode(f32::NAN), 0);
        assert!((fp.max_magnitude() - 214.748_36).abs() < 1e-2);
    }

    #[test]
    fn test_atomic_add_accumulates() {
        let fp = FixedPoint::new(1000.0);
        let acc = AtomicI32::new(0);
        fp.atomic_add(&acc, 0.5);
        fp.atomic_add(&acc, 0.25);
        fp.atomic_add(&acc, -0.125);
        assert!((fp.load(&acc) - 0.625).abs() < 1e-3);
    }

    #[test]
    #[should_panic(expected = "multiplier must be positive")]
    fn test_rejects_zero_multiplier() {
        let _ = FixedPoint::new(0.0);
    }
}
