//! Discrete pseudo Wigner distribution over uniform time and frequency grids.
//!
//! For each time sample `T[n]` the kernel forms the lag products
//! `x(T[n] + τ) x(T[n] - τ)` over the symmetric window `|τ| <= Q dt`, where
//! `Q = min(n, len(T) - 1 - n)` shrinks toward the ends of the grid. The products
//! are zero-padded to `N = round(1 / (dt * df))`, transformed with one forward
//! FFT, and read back at bin `(m + f_offset) mod N` for each requested frequency
//! `F[m]`, with a phase factor compensating for the window starting at lag `-Q`.
//!
//! The two lag arguments move apart by `2 dt` per lag step, so a real tone at
//! `f0` concentrates at `F = ±2 f0` on this axis, next to the auto-term at
//! `F = 0`.

use crate::error::Result;
use crate::grid::UniformGrid;
use crate::kernel::{KernelLifecycle, Read1D};
use crate::signal::source::Signal;
use crate::signal::traits::PseudoWigner2D;
use ndarray::Array2;
use rustfft::num_complex::Complex;

mod kernels;
pub use kernels::*;

/// Compute the pseudo Wigner distribution of `signal` on the grids `times` and `freqs`.
///
/// Returns a `(len(times), len(freqs))` matrix indexed `[time, frequency]`.
/// Grid validation and transform sizing errors surface as
/// [`Error::Configuration`](crate::Error::Configuration) before the signal is
/// evaluated; a signal failure or non-finite sample surfaces as
/// [`Error::Domain`](crate::Error::Domain) naming the offending time.
///
/// ```
/// use wigner_rs::grid::UniformGrid;
/// use wigner_rs::signal::wigner::wigner;
///
/// let t = UniformGrid::arange(0.0, 3.0, 0.05).unwrap();
/// let f = UniformGrid::arange(-10.0, 10.0, 0.1).unwrap();
/// let x = wigner(&|t: f64| (2.0 * std::f64::consts::PI * t).cos(), &t, &f).unwrap();
/// assert_eq!(x.dim(), (t.len(), f.len()));
/// ```
pub fn wigner<S, T, F>(signal: &S, times: &T, freqs: &F) -> Result<Array2<Complex<f64>>>
where
    S: Signal + ?Sized,
    T: Read1D<f64> + ?Sized,
    F: Read1D<f64> + ?Sized,
{
    let times = UniformGrid::validated(times.read_slice()?, "times")?;
    let freqs = UniformGrid::validated(freqs.read_slice()?, "freqs")?;
    let kernel = PseudoWignerKernel::try_new(PseudoWignerConfig::new(times, freqs))?;
    Ok(kernel.run_alloc(signal)?)
}
