//! Forward fake quantization and its straight-through-estimator gradient.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::array::Array;
use crate::elementwise::{default_backend, ElementwiseMap};
use crate::error::{FakeQuantError, Result};

use super::affine::AffineQuantizer;
use super::params::{validate_call, DelayState, QuantParams};

/// Fake-quantize `input` on the default backend.
///
/// Returns an exact copy of `input` while `0 < quant_delay` and
/// `iter <= quant_delay`.
pub fn forward(
    input: &Array,
    scale: f64,
    zero_point: i64,
    quant_min: i64,
    quant_max: i64,
    quant_delay: i64,
    iter: i64,
) -> Result<Array> {
    forward_with(
        &default_backend(),
        input,
        &QuantParams::new(scale, zero_point, quant_min, quant_max),
        &DelayState::new(quant_delay, iter),
    )
}

/// Straight-through-estimator gradient of [`forward`] on the default backend.
///
/// Gradient flows unchanged where `input` quantizes to an in-range level and is
/// zeroed where it saturates.
#[allow(clippy::too_many_arguments)]
pub fn backward(
    grad_output: &Array,
    input: &Array,
    scale: f64,
    zero_point: i64,
    quant_min: i64,
    quant_max: i64,
    quant_delay: i64,
    iter: i64,
) -> Result<Array> {
    backward_with(
        &default_backend(),
        grad_output,
        input,
        &QuantParams::new(scale, zero_point, quant_min, quant_max),
        &DelayState::new(quant_delay, iter),
    )
}

pub fn forward_with<M: ElementwiseMap>(
    backend: &M,
    input: &Array,
    params: &QuantParams,
    delay: &DelayState,
) -> Result<Array> {
    validate_call(params, delay)?;
    check_device(backend, input)?;

    if delay.is_warming_up() {
        debug!(
            quant_delay = delay.quant_delay,
            iter = delay.iter,
            "fake quantize forward in warm-up, passing input through"
        );
        return Ok(input.clone());
    }

    let quantizer = AffineQuantizer::new(params);
    let mut output = Array::empty_like(input);

    trace!(numel = input.numel(), "dispatching fake quantize forward");
    backend.map_unary(input.data(), output.data_mut(), move |x| {
        quantizer.fake_quantize(x)
    });

    Ok(output)
}

pub fn backward_with<M: ElementwiseMap>(
    backend: &M,
    grad_output: &Array,
    input: &Array,
    params: &QuantParams,
    delay: &DelayState,
) -> Result<Array> {
    validate_call(params, delay)?;
    check_device(backend, input)?;
    check_device(backend, grad_output)?;

    if !input.is_conformant(grad_output) {
        return Err(FakeQuantError::ShapeMismatch {
            expected: input.numel(),
            actual: grad_output.numel(),
        });
    }

    // An empty gradient is indistinguishable in content from the empty input.
    if input.is_empty() {
        debug!("fake quantize backward on empty input");
        return Ok(input.clone());
    }

    if delay.is_warming_up() {
        debug!(
            quant_delay = delay.quant_delay,
            iter = delay.iter,
            "fake quantize backward in warm-up, passing gradient through"
        );
        return Ok(grad_output.clone());
    }

    let quantizer = AffineQuantizer::new(params);
    let mut grad_input = Array::empty_like(input);

    trace!(numel = input.numel(), "dispatching fake quantize backward");
    backend.map_binary(
        input.data(),
        grad_output.data(),
        grad_input.data_mut(),
        move |x, grad| quantizer.grad_mask(x) * grad,
    );

    Ok(grad_input)
}

fn check_device<M: ElementwiseMap>(backend: &M, array: &Array) -> Result<()> {
    if backend.supports(array.device()) {
        Ok(())
    } else {
        Err(FakeQuantError::UnsupportedDevice(array.device()))
    }
}

/// A quantization scheme bundled with its warm-up state.
///
/// Holds only call arguments; advancing `delay.iter` is up to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FakeQuantize {
    pub params: QuantParams,
    #[serde(default)]
    pub delay: DelayState,
}

impl FakeQuantize {
    pub fn new(params: QuantParams, delay: DelayState) -> Self {
        Self { params, delay }
    }

    pub fn forward(&self, input: &Array) -> Result<Array> {
        forward_with(&default_backend(), input, &self.params, &self.delay)
    }

    pub fn backward(&self, grad_output: &Array, input: &Array) -> Result<Array> {
        backward_with(
            &default_backend(),
            grad_output,
            input,
            &self.params,
            &self.delay,
        )
    }
}
