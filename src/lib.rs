pub mod array;
pub mod elementwise;
pub mod error;
pub mod quantization;

pub use array::{Array, Device};
pub use error::{FakeQuantError, Result};
pub use quantization::{backward, forward, DelayState, FakeQuantize, QuantParams};
