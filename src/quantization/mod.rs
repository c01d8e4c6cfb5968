//! Per-tensor affine fake quantization.
//!
//! - Forward: round → clamp → dequantize, so values stay `f32` but land on the
//!   levels representable by the scheme.
//! - Backward: straight-through estimator. The incoming gradient passes through
//!   where the input maps to an in-range level and is zeroed where it saturates.
//!
//! Both transforms share one validation step and an optional warm-up window
//! (`quant_delay`) during which they act as identity.

mod affine;
mod ops;
mod params;

pub use affine::AffineQuantizer;
pub use ops::{backward, backward_with, forward, forward_with, FakeQuantize};
pub use params::{validate, DelayState, QuantParams};
