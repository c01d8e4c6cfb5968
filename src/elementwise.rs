//! Elementwise map backends.
//!
//! A backend applies a pure per-element function to corresponding positions of
//! one or two input buffers, writing into a separate output buffer. Positions
//! are independent, so a backend may visit them in any order or concurrently.

use crate::array::Device;

pub trait ElementwiseMap: Sync {
    fn supports(&self, device: Device) -> bool;

    /// `out[i] = f(input[i])`. All slices have the same length.
    fn map_unary<F>(&self, input: &[f32], out: &mut [f32], f: F)
    where
        F: Fn(f32) -> f32 + Sync + Send;

    /// `out[i] = f(lhs[i], rhs[i])`. All slices have the same length.
    fn map_binary<F>(&self, lhs: &[f32], rhs: &[f32], out: &mut [f32], f: F)
    where
        F: Fn(f32, f32) -> f32 + Sync + Send;
}

/// Single-threaded host backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl ElementwiseMap for Sequential {
    fn supports(&self, device: Device) -> bool {
        device == Device::Cpu
    }

    fn map_unary<F>(&self, input: &[f32], out: &mut [f32], f: F)
    where
        F: Fn(f32) -> f32 + Sync + Send,
    {
        debug_assert_eq!(input.len(), out.len());
        for (o, &x) in out.iter_mut().zip(input) {
            *o = f(x);
        }
    }

    fn map_binary<F>(&self, lhs: &[f32], rhs: &[f32], out: &mut [f32], f: F)
    where
        F: Fn(f32, f32) -> f32 + Sync + Send,
    {
        debug_assert_eq!(lhs.len(), out.len());
        debug_assert_eq!(rhs.len(), out.len());
        for ((o, &a), &b) in out.iter_mut().zip(lhs).zip(rhs) {
            *o = f(a, b);
        }
    }
}

/// Multi-threaded host backend on the rayon pool.
#[cfg(feature = "parallel")]
#[derive(Debug, Clone, Copy)]
pub struct Parallel {
    threshold: usize,
}

#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 4096;

#[cfg(feature = "parallel")]
impl Parallel {
    /// Buffers shorter than `threshold` are mapped on the calling thread.
    pub fn with_threshold(threshold: usize) -> Self {
        Self { threshold }
    }
}

#[cfg(feature = "parallel")]
impl Default for Parallel {
    fn default() -> Self {
        Self::with_threshold(PARALLEL_THRESHOLD)
    }
}

#[cfg(feature = "parallel")]
impl ElementwiseMap for Parallel {
    fn supports(&self, device: Device) -> bool {
        device == Device::Cpu
    }

    fn map_unary<F>(&self, input: &[f32], out: &mut [f32], f: F)
    where
        F: Fn(f32) -> f32 + Sync + Send,
    {
        use rayon::prelude::*;

        if out.len() < self.threshold {
            return Sequential.map_unary(input, out, f);
        }

        debug_assert_eq!(input.len(), out.len());
        out.par_iter_mut()
            .zip(input.par_iter())
            .for_each(|(o, &x)| *o = f(x));
    }

    fn map_binary<F>(&self, lhs: &[f32], rhs: &[f32], out: &mut [f32], f: F)
    where
        F: Fn(f32, f32) -> f32 + Sync + Send,
    {
        use rayon::prelude::*;

        if out.len() < self.threshold {
            return Sequential.map_binary(lhs, rhs, out, f);
        }

        debug_assert_eq!(lhs.len(), out.len());
        debug_assert_eq!(rhs.len(), out.len());
        out.par_iter_mut()
            .zip(lhs.par_iter().zip(rhs.par_iter()))
            .for_each(|(o, (&a, &b))| *o = f(a, b));
    }
}

#[cfg(feature = "parallel")]
pub type DefaultBackend = Parallel;

#[cfg(not(feature = "parallel"))]
pub type DefaultBackend = Sequential;

pub fn default_backend() -> DefaultBackend {
    DefaultBackend::default()
}
