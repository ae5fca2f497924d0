//! Generation-time kernel and the effective incidence it induces.
//!
//! The default weights discretize a gamma generation time for influenza
//! (Carrat et al., AJE 2008, doi:10.1093/aje/kwm375) with mean 2.5 days and
//! variance 0.6 over delays of 1..=5 days, normalized to sum to one.

use nalgebra::Vector5;

use crate::error::{ForecastError, Result};

/// Number of daily delays covered by the kernel.
pub const KERNEL_LEN: usize = 5;

pub const DEFAULT_WEIGHTS: [f64; KERNEL_LEN] =
    [0.04753979, 0.50372795, 0.35549083, 0.08275124, 0.01049019];

const SUM_TOLERANCE: f64 = 1e-6;

/// Immutable probability mass over a 1..=5 day delay from infection to an
/// observed secondary case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationKernel {
    weights: Vector5<f64>,
}

impl GenerationKernel {
    pub fn new(weights: [f64; KERNEL_LEN]) -> Result<Self> {
        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.) {
            return Err(ForecastError::InvalidKernel(format!(
                "weights must be finite and non-negative, got {w}"
            )));
        }
        let total: f64 = weights.iter().sum();
        if f64::abs(total - 1.) > SUM_TOLERANCE {
            return Err(ForecastError::InvalidKernel(format!(
                "weights must sum to 1, got {total}"
            )));
        }
        Ok(GenerationKernel {
            weights: Vector5::from(weights),
        })
    }

    pub fn from_slice(weights: &[f64]) -> Result<Self> {
        let weights: [f64; KERNEL_LEN] = weights.try_into().map_err(|_| {
            ForecastError::InvalidKernel(format!(
                "expected {KERNEL_LEN} weights, got {}",
                weights.len()
            ))
        })?;
        Self::new(weights)
    }

    pub fn weights(&self) -> &[f64] {
        self.weights.as_slice()
    }

    /// Kernel-weighted sum of the five most recent values of `window`
    /// (chronological, oldest first). The first weight applies to the newest
    /// value.
    pub fn effective_incidence(&self, window: &[f64]) -> Result<f64> {
        if window.len() < KERNEL_LEN {
            return Err(ForecastError::InsufficientHistory {
                needed: KERNEL_LEN,
                available: window.len(),
            });
        }
        let recent = &window[window.len() - KERNEL_LEN..];
        let newest_first = Vector5::from_iterator(recent.iter().rev().copied());
        Ok(self.weights.dot(&newest_first))
    }
}

impl Default for GenerationKernel {
    fn default() -> Self {
        GenerationKernel {
            weights: Vector5::from(DEFAULT_WEIGHTS),
        }
    }
}
