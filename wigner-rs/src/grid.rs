//! Uniformly spaced sample grids for the time and frequency axes.

use crate::kernel::{ConfigError, Read1D};
use ndarray::Array1;

/// Relative tolerance used when checking that consecutive steps agree.
const UNIFORM_STEP_RTOL: f64 = 1e-6;

/// Ordered, strictly increasing, uniformly spaced sequence of reals.
///
/// Holds at least two samples so the step `x[1] - x[0]` is always defined.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformGrid {
    samples: Array1<f64>,
}

impl UniformGrid {
    /// Build a grid with numpy `arange` semantics: `start + i * step` for
    /// `i in 0..ceil((stop - start) / step)`.
    ///
    /// ```
    /// use wigner_rs::grid::UniformGrid;
    ///
    /// let t = UniformGrid::arange(0.0, 30.0, 0.05).unwrap();
    /// assert_eq!(t.len(), 600);
    /// ```
    pub fn arange(start: f64, stop: f64, step: f64) -> Result<Self, ConfigError> {
        if !start.is_finite() || !stop.is_finite() {
            return Err(ConfigError::InvalidArgument {
                arg: "start/stop",
                reason: "grid bounds must be finite",
            });
        }
        if !step.is_finite() || step <= 0.0 {
            return Err(ConfigError::InvalidArgument {
                arg: "step",
                reason: "grid step must be finite and > 0",
            });
        }
        let count = ((stop - start) / step).ceil();
        if !(count >= 2.0) {
            return Err(ConfigError::InvalidArgument {
                arg: "stop",
                reason: "grid must hold at least two samples",
            });
        }
        let count = count as usize;
        let samples = Array1::from_iter((0..count).map(|i| start + i as f64 * step));
        Ok(Self { samples })
    }

    /// Validate a caller supplied sequence.
    pub fn try_from_samples<I>(samples: &I) -> Result<Self, ConfigError>
    where
        I: Read1D<f64> + ?Sized,
    {
        Self::validated(samples.read_slice()?, "grid")
    }

    /// Same as [`UniformGrid::try_from_samples`], naming the grid in errors.
    pub(crate) fn validated(x: &[f64], arg: &'static str) -> Result<Self, ConfigError> {
        if x.is_empty() {
            return Err(ConfigError::EmptyInput { arg });
        }
        if x.len() < 2 {
            return Err(ConfigError::InvalidArgument {
                arg,
                reason: "grid must hold at least two samples",
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidArgument {
                arg,
                reason: "grid samples must be finite",
            });
        }
        let step = x[1] - x[0];
        if step <= 0.0 {
            return Err(ConfigError::InvalidArgument {
                arg,
                reason: "grid must be strictly increasing",
            });
        }
        let tol = step * UNIFORM_STEP_RTOL;
        for (i, pair) in x.windows(2).enumerate().skip(1) {
            let got = pair[1] - pair[0];
            if (got - step).abs() > tol {
                return Err(ConfigError::NonUniformGrid {
                    arg,
                    index: i,
                    expected: step,
                    got,
                });
            }
        }
        Ok(Self {
            samples: Array1::from(x.to_vec()),
        })
    }

    /// Grid samples.
    pub fn samples(&self) -> &[f64] {
        // Built from owned vectors, always standard layout.
        self.samples.as_slice().unwrap_or(&[])
    }

    /// Number of samples, always at least two.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false`; grids hold at least two samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First sample.
    pub fn first(&self) -> f64 {
        self.samples[0]
    }

    /// Last sample.
    pub fn last(&self) -> f64 {
        self.samples[self.samples.len() - 1]
    }

    /// Grid resolution `x[1] - x[0]`.
    pub fn step(&self) -> f64 {
        self.samples[1] - self.samples[0]
    }
}

impl Read1D<f64> for UniformGrid {
    fn read_slice(&self) -> Result<&[f64], ConfigError> {
        self.samples
            .as_slice()
            .ok_or(ConfigError::NonContiguous { arg: "grid" })
    }
}
