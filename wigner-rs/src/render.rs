//! Magnitude images of time-frequency distributions.

use crate::grid::UniformGrid;
use crate::kernel::{ConfigError, KernelLifecycle};
use ndarray::{Array2, ArrayView2};
use rustfft::num_complex::Complex;

/// Axis extent `(T[0], T[-1], F[0], F[-1])` attached to an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// First time sample.
    pub t_min: f64,
    /// Last time sample.
    pub t_max: f64,
    /// First frequency sample.
    pub f_min: f64,
    /// Last frequency sample.
    pub f_max: f64,
}

impl Extent {
    /// Extent spanned by a time grid and a frequency grid.
    pub fn from_grids(times: &UniformGrid, freqs: &UniformGrid) -> Self {
        Self {
            t_min: times.first(),
            t_max: times.last(),
            f_min: freqs.first(),
            f_max: freqs.last(),
        }
    }
}

/// Normalized magnitudes laid out frequency-major: `pixels[[freq, time]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MagnitudeImage {
    /// Magnitudes scaled into `[0, ceiling]`.
    pub pixels: Array2<f64>,
    /// Optional axis extent metadata.
    pub extent: Option<Extent>,
}

impl MagnitudeImage {
    /// Attach axis extent metadata.
    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = Some(extent);
        self
    }
}

/// Constructor config for [`MagnitudeImageKernel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeImageConfig {
    /// Display ceiling `C`; the largest magnitude maps to this value.
    pub ceiling: f64,
}

impl Default for MagnitudeImageConfig {
    fn default() -> Self {
        Self { ceiling: 500.0 }
    }
}

/// Transposes a `[time, frequency]` distribution and scales `|X|` into `[0, C]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeImageKernel {
    ceiling: f64,
}

impl KernelLifecycle for MagnitudeImageKernel {
    type Config = MagnitudeImageConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        if !config.ceiling.is_finite() || config.ceiling <= 0.0 {
            return Err(ConfigError::InvalidArgument {
                arg: "ceiling",
                reason: "ceiling must be finite and > 0",
            });
        }
        Ok(Self {
            ceiling: config.ceiling,
        })
    }
}

impl MagnitudeImageKernel {
    /// Configured display ceiling.
    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Render `x` (indexed `[time, frequency]`) into a frequency-major image.
    pub fn run_alloc(
        &self,
        x: ArrayView2<'_, Complex<f64>>,
    ) -> Result<MagnitudeImage, ConfigError> {
        if x.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "distribution" });
        }
        let mut pixels = x.t().mapv(|v| v.norm());
        if pixels.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidArgument {
                arg: "distribution",
                reason: "distribution holds non-finite magnitudes",
            });
        }
        let peak = pixels.iter().copied().fold(0.0, f64::max);
        if peak > 0.0 {
            let scale = self.ceiling / peak;
            pixels.mapv_inplace(|v| v * scale);
        } else {
            tracing::warn!("distribution is identically zero; rendering a blank image");
        }
        Ok(MagnitudeImage {
            pixels,
            extent: None,
        })
    }
}

/// Render `x` with display ceiling `ceiling`, attaching the grid extent.
pub fn magnitude_image(
    x: &Array2<Complex<f64>>,
    times: &UniformGrid,
    freqs: &UniformGrid,
    ceiling: f64,
) -> Result<MagnitudeImage, ConfigError> {
    let kernel = MagnitudeImageKernel::try_new(MagnitudeImageConfig { ceiling })?;
    let expected = (times.len(), freqs.len());
    if x.dim() != expected {
        return Err(ConfigError::ShapeMismatch {
            arg: "distribution",
            expected,
            got: x.dim(),
        });
    }
    Ok(kernel
        .run_alloc(x.view())?
        .with_extent(Extent::from_grids(times, freqs)))
}
