//! Discrete pseudo Wigner time-frequency distributions.
//!
//! The crate evaluates a continuous-time [`Signal`](signal::Signal) on a
//! uniform time grid, computes its pseudo Wigner distribution over a uniform
//! frequency grid, and renders the result as a normalized magnitude image.
//!
//! ```
//! use wigner_rs::grid::UniformGrid;
//! use wigner_rs::kernel::KernelLifecycle;
//! use wigner_rs::signal::traits::PseudoWigner2D;
//! use wigner_rs::signal::wigner::{PseudoWignerConfig, PseudoWignerKernel};
//!
//! let times = UniformGrid::arange(0.0, 5.0, 0.05).unwrap();
//! let freqs = UniformGrid::arange(-10.0, 10.0, 0.05).unwrap();
//! let kernel = PseudoWignerKernel::try_new(PseudoWignerConfig::new(times, freqs)).unwrap();
//! let x = kernel
//!     .run_alloc(&|t: f64| (2.0 * std::f64::consts::PI * t).cos())
//!     .unwrap();
//! assert_eq!(x.dim(), kernel.shape());
//! ```
#![deny(missing_docs)]

/// Crate-level errors for the free-function API.
pub mod error;
pub mod grid;
pub mod kernel;
/// Matplotlib-backed image output.
pub mod plot;
pub mod render;
pub mod signal;

pub use error::{Error, Result};

/// Re-export of the `ndarray` crate used for distribution matrices.
pub use ndarray;
/// Complex sample type used throughout the crate.
pub use rustfft::num_complex::Complex;
