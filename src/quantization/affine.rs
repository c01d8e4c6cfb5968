use super::params::QuantParams;

/// Per-call affine quantizer with its constants prepared in `f32`.
///
/// `1 / scale` is computed once here instead of per element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineQuantizer {
    scale: f32,
    inv_scale: f32,
    zero_point: f32,
    quant_min: f32,
    quant_max: f32,
}

impl AffineQuantizer {
    pub fn new(params: &QuantParams) -> Self {
        AffineQuantizer {
            scale: params.scale as f32,
            inv_scale: (1.0 / params.scale) as f32,
            zero_point: params.zero_point as f32,
            quant_min: params.quant_min as f32,
            quant_max: params.quant_max as f32,
        }
    }

    /// Nearest level for `real_val`, before clamping. Ties round away from zero.
    #[inline]
    pub fn quantize(&self, real_val: f32) -> f32 {
        (real_val * self.inv_scale + self.zero_point).round()
    }

    #[inline]
    pub fn dequantize(&self, q_val: f32) -> f32 {
        (q_val - self.zero_point) * self.scale
    }

    /// Round, clamp to the level range, and map back to a real value.
    #[inline]
    pub fn fake_quantize(&self, real_val: f32) -> f32 {
        let q = self
            .quantize(real_val)
            .clamp(self.quant_min, self.quant_max);
        self.dequantize(q)
    }

    /// 1.0 where the unclamped level is inside `[quant_min, quant_max]`, else 0.0.
    #[inline]
    pub fn grad_mask(&self, real_val: f32) -> f32 {
        let q = self.quantize(real_val);
        if q >= self.quant_min && q <= self.quant_max {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uint8() -> AffineQuantizer {
        AffineQuantizer::new(&QuantParams::new(0.5, 10, 0, 255))
    }

    #[test]
    fn rounds_in_range_value() {
        let q = uint8();
        assert_eq!(q.quantize(3.3), 17.0);
        assert_eq!(q.fake_quantize(3.3), 3.5);
        assert_eq!(q.grad_mask(3.3), 1.0);
    }

    #[test]
    fn saturates_large_value() {
        let q = uint8();
        assert_eq!(q.quantize(200.0), 410.0);
        assert_eq!(q.fake_quantize(200.0), 122.5);
        assert_eq!(q.grad_mask(200.0), 0.0);
    }

    #[test]
    fn saturates_below_range() {
        let q = uint8();
        // round(-20 * 2 + 10) = -30, clamped to 0
        assert_eq!(q.fake_quantize(-20.0), -5.0);
        assert_eq!(q.grad_mask(-20.0), 0.0);
        // round(-5 * 2 + 10) = 0, the lowest level itself
        assert_eq!(q.grad_mask(-5.0), 1.0);
    }

    #[test]
    fn ties_round_away_from_zero() {
        let q = AffineQuantizer::new(&QuantParams::new(1.0, 0, -8, 7));
        assert_eq!(q.quantize(2.5), 3.0);
        assert_eq!(q.quantize(-2.5), -3.0);
    }

    #[test]
    fn dequantize_inverts_levels() {
        let q = uint8();
        for level in [0.0f32, 10.0, 11.0, 255.0] {
            assert_eq!(q.quantize(q.dequantize(level)), level);
        }
    }
}
