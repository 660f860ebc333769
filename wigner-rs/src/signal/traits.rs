//! Trait interfaces for time-frequency distribution capabilities.

use crate::kernel::{ExecInvariantViolation, Write1D};
use crate::signal::source::Signal;
use ndarray::{Array1, Array2, ArrayViewMut2};
use rustfft::num_complex::Complex;

/// Pseudo Wigner distribution capability over a fixed time/frequency grid.
///
/// Output is indexed `[time, frequency]`.
pub trait PseudoWigner2D {
    /// Compute the full distribution into a caller-provided matrix.
    fn run_into<S>(
        &self,
        signal: &S,
        out: &mut ArrayViewMut2<'_, Complex<f64>>,
    ) -> Result<(), ExecInvariantViolation>
    where
        S: Signal + ?Sized;

    /// Compute the full distribution and allocate output.
    fn run_alloc<S>(&self, signal: &S) -> Result<Array2<Complex<f64>>, ExecInvariantViolation>
    where
        S: Signal + ?Sized;

    /// Compute the single time row `n` into a caller-provided buffer.
    fn run_row_into<S, O>(
        &self,
        signal: &S,
        n: usize,
        out: &mut O,
    ) -> Result<(), ExecInvariantViolation>
    where
        S: Signal + ?Sized,
        O: Write1D<Complex<f64>> + ?Sized;

    /// Compute the single time row `n` and allocate output.
    fn run_row<S>(
        &self,
        signal: &S,
        n: usize,
    ) -> Result<Array1<Complex<f64>>, ExecInvariantViolation>
    where
        S: Signal + ?Sized;
}
