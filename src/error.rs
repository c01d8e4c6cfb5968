use thiserror::Error;

use crate::array::Device;

/// Errors raised by the fake quantization transforms.
///
/// Every variant is produced before any element is computed, so a failed call
/// never leaves a partially written output behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FakeQuantError {
    #[error("quant_min ({quant_min}) must not exceed quant_max ({quant_max})")]
    InvalidRange { quant_min: i64, quant_max: i64 },

    #[error("zero_point must be non-negative, got {0}")]
    InvalidZeroPoint(i64),

    #[error("quant_delay must be non-negative, got {0}")]
    InvalidDelay(i64),

    #[error("iter must be non-negative when quant_delay is set (quant_delay={quant_delay}, iter={iter})")]
    InvalidIter { quant_delay: i64, iter: i64 },

    #[error("element count mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("observed range cannot be calibrated onto levels [{quant_min}, {quant_max}] with a non-negative zero point")]
    UncalibratableRange { quant_min: i64, quant_max: i64 },

    #[error("device {0} is not supported by the elementwise backend")]
    UnsupportedDevice(Device),
}

pub type Result<T> = std::result::Result<T, FakeQuantError>;
