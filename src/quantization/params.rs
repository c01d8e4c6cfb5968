use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FakeQuantError, Result};

const MIN_SCALE: f64 = 1e-10;

/// Per-tensor affine quantization scheme.
///
/// Real value `x` maps to level `clamp(round(x / scale + zero_point), quant_min, quant_max)`
/// and level `q` maps back to `(q - zero_point) * scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantParams {
    pub scale: f64,
    pub zero_point: i64,
    pub quant_min: i64,
    pub quant_max: i64,
}

impl QuantParams {
    pub fn new(scale: f64, zero_point: i64, quant_min: i64, quant_max: i64) -> Self {
        Self {
            scale,
            zero_point,
            quant_min,
            quant_max,
        }
    }

    /// Unsigned `bits`-wide range `[0, 2^bits - 1]`, e.g. `[0, 255]` for 8 bits.
    pub fn unsigned(bits: u32, scale: f64, zero_point: i64) -> Self {
        assert!((1..=32).contains(&bits), "bits must be in 1..=32");
        Self::new(scale, zero_point, 0, (1_i64 << bits) - 1)
    }

    /// Min-max calibration onto `[quant_min, quant_max]`.
    ///
    /// The observed range is widened to include 0 so that real zero is exactly
    /// representable. The zero point is clamped to the level range and then
    /// floored at 0, since negative zero points are rejected by validation. The
    /// scale is then widened until both ends of the observed range fall on or
    /// inside the outermost levels.
    ///
    /// Fails with `UncalibratableRange` when no non-negative zero point leaves
    /// levels on the side of zero that the observed range needs, e.g. positive
    /// values with `quant_max <= 0`.
    pub fn from_min_max(
        min_val: f32,
        max_val: f32,
        quant_min: i64,
        quant_max: i64,
    ) -> Result<Self> {
        let min_val = f64::from(min_val.min(0.0));
        let max_val = f64::from(max_val.max(0.0));
        let lo = quant_min as f64;
        let hi = (quant_max as f64).max(lo);

        let mut scale = ((max_val - min_val) / (hi - lo).max(1.0)).max(MIN_SCALE);
        let zero_point = (lo - min_val / scale).round().clamp(lo, hi).max(0.0);

        let levels_below = lo - zero_point;
        let levels_above = hi - zero_point;
        if (min_val < 0.0 && levels_below >= 0.0) || (max_val > 0.0 && levels_above <= 0.0) {
            return Err(FakeQuantError::UncalibratableRange {
                quant_min,
                quant_max,
            });
        }
        if levels_below < 0.0 {
            scale = scale.max(min_val / levels_below);
        }
        if levels_above > 0.0 {
            scale = scale.max(max_val / levels_above);
        }

        Ok(Self::new(scale, zero_point as i64, quant_min, quant_max))
    }

    /// Number of distinct quantization levels, 0 for an inverted range.
    ///
    /// Saturates at `u64::MAX` for the full `i64` range.
    pub fn num_levels(&self) -> u64 {
        if self.quant_min > self.quant_max {
            return 0;
        }
        self.quant_max
            .abs_diff(self.quant_min)
            .saturating_add(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.quant_min > self.quant_max {
            return Err(FakeQuantError::InvalidRange {
                quant_min: self.quant_min,
                quant_max: self.quant_max,
            });
        }
        if self.zero_point < 0 {
            return Err(FakeQuantError::InvalidZeroPoint(self.zero_point));
        }
        Ok(())
    }
}

/// Warm-up window: quantization stays off while `iter <= quant_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DelayState {
    pub quant_delay: i64,
    pub iter: i64,
}

impl DelayState {
    pub fn new(quant_delay: i64, iter: i64) -> Self {
        Self { quant_delay, iter }
    }

    /// No warm-up; quantization applies from the first call.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_warming_up(&self) -> bool {
        self.quant_delay > 0 && self.iter <= self.quant_delay
    }

    pub fn validate(&self) -> Result<()> {
        if self.quant_delay < 0 {
            return Err(FakeQuantError::InvalidDelay(self.quant_delay));
        }
        if self.quant_delay != 0 && self.iter < 0 {
            return Err(FakeQuantError::InvalidIter {
                quant_delay: self.quant_delay,
                iter: self.iter,
            });
        }
        Ok(())
    }
}

/// Checks shared by the forward and backward transforms.
///
/// The zero point is only required to be non-negative; it may lie outside
/// `[quant_min, quant_max]`.
pub fn validate(
    quant_min: i64,
    quant_max: i64,
    zero_point: i64,
    quant_delay: i64,
    iter: i64,
) -> Result<()> {
    // scale is not inspected here
    let params = QuantParams::new(1.0, zero_point, quant_min, quant_max);
    let delay = DelayState::new(quant_delay, iter);
    validate_call(&params, &delay)
}

pub(crate) fn validate_call(params: &QuantParams, delay: &DelayState) -> Result<()> {
    params
        .validate()
        .and_then(|()| delay.validate())
        .inspect_err(|err| debug!(%err, "rejected fake quantization arguments"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_well_formed_arguments() {
        assert_eq!(validate(0, 255, 128, 0, -7), Ok(()));
        assert_eq!(validate(-128, 127, 0, 10, 0), Ok(()));
        assert_eq!(validate(3, 3, 3, 1, 5), Ok(()));
    }

    #[test]
    fn validate_rejects_inverted_range() {
        assert_eq!(
            validate(5, 2, 0, 0, 0),
            Err(FakeQuantError::InvalidRange {
                quant_min: 5,
                quant_max: 2
            })
        );
    }

    #[test]
    fn validate_rejects_negative_zero_point() {
        assert_eq!(
            validate(0, 255, -1, 0, 0),
            Err(FakeQuantError::InvalidZeroPoint(-1))
        );
    }

    #[test]
    fn validate_rejects_negative_delay() {
        assert_eq!(
            validate(0, 255, 0, -1, 0),
            Err(FakeQuantError::InvalidDelay(-1))
        );
    }

    #[test]
    fn validate_rejects_negative_iter_only_with_delay() {
        assert_eq!(
            validate(0, 255, 0, 3, -1),
            Err(FakeQuantError::InvalidIter {
                quant_delay: 3,
                iter: -1
            })
        );
        assert_eq!(validate(0, 255, 0, 0, -1), Ok(()));
    }

    #[test]
    fn validate_reports_range_before_zero_point() {
        assert!(matches!(
            validate(9, 1, -4, -2, -3),
            Err(FakeQuantError::InvalidRange { .. })
        ));
    }

    #[test]
    fn zero_point_outside_range_is_allowed() {
        assert_eq!(QuantParams::new(0.1, 300, 0, 255).validate(), Ok(()));
    }

    #[test]
    fn warm_up_window() {
        assert!(!DelayState::disabled().is_warming_up());
        assert!(DelayState::new(5, 0).is_warming_up());
        assert!(DelayState::new(5, 5).is_warming_up());
        assert!(!DelayState::new(5, 6).is_warming_up());
    }

    #[test]
    fn unsigned_ranges() {
        let p = QuantParams::unsigned(8, 0.5, 10);
        assert_eq!((p.quant_min, p.quant_max), (0, 255));
        assert_eq!(p.num_levels(), 256);
        assert_eq!(QuantParams::unsigned(4, 1.0, 0).quant_max, 15);
    }

    #[test]
    fn num_levels_of_signed_and_inverted_ranges() {
        assert_eq!(QuantParams::new(1.0, 0, -128, 127).num_levels(), 256);
        assert_eq!(QuantParams::new(1.0, 0, 5, 2).num_levels(), 0);
    }

    #[test]
    fn num_levels_saturates_on_full_i64_range() {
        let p = QuantParams::new(1.0, 0, i64::MIN, i64::MAX);
        assert_eq!(p.num_levels(), u64::MAX);
    }

    fn assert_covers(p: &QuantParams, min_val: f64, max_val: f64) {
        let lowest = (p.quant_min - p.zero_point) as f64 * p.scale;
        let highest = (p.quant_max - p.zero_point) as f64 * p.scale;
        assert!(lowest <= min_val + 1e-9, "{lowest} does not reach {min_val}");
        assert!(highest >= max_val - 1e-9, "{highest} does not reach {max_val}");
    }

    #[test]
    fn from_min_max_maps_extremes_to_range_ends() {
        let p = QuantParams::from_min_max(-1.0, 3.0, 0, 255).unwrap();
        assert_eq!(p.zero_point, 64);
        assert!((p.scale - 3.0 / 191.0).abs() < 1e-9);
        assert_covers(&p, -1.0, 3.0);
        assert_eq!(p.validate(), Ok(()));
    }

    #[test]
    fn from_min_max_widens_scale_when_zero_point_is_floored() {
        let p = QuantParams::from_min_max(-1.0, 3.0, -128, 127).unwrap();
        assert_eq!(p.zero_point, 0);
        assert!((p.scale - 3.0 / 127.0).abs() < 1e-9);
        assert_covers(&p, -1.0, 3.0);
        assert_eq!(p.validate(), Ok(()));
    }

    #[test]
    fn from_min_max_on_signed_range_with_negative_data() {
        let p = QuantParams::from_min_max(-5.0, 0.5, -8, 7).unwrap();
        assert_eq!(p.zero_point, 6);
        assert!((p.scale - 0.5).abs() < 1e-9);
        assert_covers(&p, -5.0, 0.5);
    }

    #[test]
    fn from_min_max_includes_zero_and_guards_degenerate_range() {
        let p = QuantParams::from_min_max(2.0, 6.0, 0, 15).unwrap();
        assert_eq!(p.zero_point, 0);
        assert!((p.scale - 6.0 / 15.0).abs() < 1e-9);

        let flat = QuantParams::from_min_max(0.0, 0.0, 0, 255).unwrap();
        assert!(flat.scale > 0.0);
        assert_eq!(flat.zero_point, 0);
    }

    #[test]
    fn from_min_max_handles_full_i64_range() {
        let p = QuantParams::from_min_max(-1.0, 1.0, i64::MIN, i64::MAX).unwrap();
        assert_eq!(p.zero_point, 0);
        assert!(p.scale > 0.0);
        assert_eq!(p.validate(), Ok(()));
    }

    #[test]
    fn from_min_max_rejects_ranges_without_room_for_the_data() {
        assert_eq!(
            QuantParams::from_min_max(-1.0, 3.0, -16, -1),
            Err(FakeQuantError::UncalibratableRange {
                quant_min: -16,
                quant_max: -1
            })
        );
        assert_eq!(
            QuantParams::from_min_max(-1.0, 3.0, 4, 4),
            Err(FakeQuantError::UncalibratableRange {
                quant_min: 4,
                quant_max: 4
            })
        );
    }
}
