use std::fmt;
use std::ops::Range;

use rand::Rng;

use crate::error::{FakeQuantError, Result};

/// Where an array's storage lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    #[default]
    Cpu,
    Cuda(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}

/// Dense, shape-tagged array of `f32` values.
///
/// Storage is row-major and contiguous; the shape only describes how the flat
/// buffer is viewed. Two arrays are conformant when their element counts match.
#[derive(PartialEq, Debug, Clone)]
pub struct Array {
    data: Vec<f32>,
    shape: Vec<usize>,
    device: Device,
}

impl Array {
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(FakeQuantError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            shape,
            device: Device::Cpu,
        })
    }

    /// One-dimensional array over `data`.
    pub fn from_vec(data: Vec<f32>) -> Self {
        let shape = vec![data.len()];
        Self {
            data,
            shape,
            device: Device::Cpu,
        }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: vec![0.0; shape.iter().product()],
            shape: shape.to_vec(),
            device: Device::Cpu,
        }
    }

    pub fn random(shape: &[usize], range: Range<f32>) -> Self {
        let size: usize = shape.iter().product();
        let mut data = Vec::<f32>::with_capacity(size);

        let mut rng = rand::rng();

        for _ in 0..size {
            data.push(rng.random_range(range.clone()));
        }

        Self {
            data,
            shape: shape.to_vec(),
            device: Device::Cpu,
        }
    }

    /// Allocate an array with the same shape and device as `other`.
    ///
    /// Safe Rust has no uninitialized buffers, so the contents are zeroed; callers
    /// must still treat them as unspecified and overwrite every position.
    pub fn empty_like(other: &Self) -> Self {
        Self::zeros_like(other)
    }

    pub fn zeros_like(other: &Self) -> Self {
        Self {
            data: vec![0.0; other.data.len()],
            shape: other.shape.clone(),
            device: other.device,
        }
    }

    /// Retag the array with another device. No data moves.
    pub fn to_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn is_conformant(&self, other: &Self) -> bool {
        self.numel() == other.numel()
    }

    /// Smallest and largest element, ignoring NaNs. `None` for an empty array.
    pub fn min_and_max(&self) -> Option<(f32, f32)> {
        if self.data.is_empty() {
            return None;
        }

        let min = self.data.iter().copied().fold(f32::INFINITY, f32::min);
        let max = self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        Some((min, max))
    }
}
