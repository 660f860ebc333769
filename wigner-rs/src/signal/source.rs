//! Continuous-time signal capability consumed by the distribution kernels.

use core::fmt::Display;
use rustfft::num_complex::Complex;

/// Value produced by a signal function at one time argument.
pub trait SignalValue {
    /// Convert into a complex sample, or the failure reported by the signal.
    fn into_sample(self) -> Result<Complex<f64>, String>;
}

impl SignalValue for f64 {
    fn into_sample(self) -> Result<Complex<f64>, String> {
        Ok(Complex::new(self, 0.0))
    }
}

impl SignalValue for Complex<f64> {
    fn into_sample(self) -> Result<Complex<f64>, String> {
        Ok(self)
    }
}

impl<T, E> SignalValue for Result<T, E>
where
    T: SignalValue,
    E: Display,
{
    fn into_sample(self) -> Result<Complex<f64>, String> {
        match self {
            Ok(v) => v.into_sample(),
            Err(err) => Err(err.to_string()),
        }
    }
}

/// Pure mapping from a real time value to a real or complex amplitude.
///
/// The kernel queries the signal at arbitrary real arguments, including
/// outside the time grid. Implemented for every `Fn(f64) -> R` closure where
/// `R` is `f64`, `Complex<f64>`, or a `Result` of either.
pub trait Signal: Sync {
    /// Evaluate the signal at time `t`.
    fn sample(&self, t: f64) -> Result<Complex<f64>, String>;
}

impl<F, R> Signal for F
where
    F: Fn(f64) -> R + Sync,
    R: SignalValue,
{
    fn sample(&self, t: f64) -> Result<Complex<f64>, String> {
        self(t).into_sample()
    }
}
