use crate::grid::UniformGrid;
use crate::kernel::{ConfigError, ExecInvariantViolation, KernelLifecycle, Write1D};
use crate::signal::source::Signal;
use crate::signal::traits::PseudoWigner2D;
use core::fmt;
use ndarray::{Array1, Array2, ArrayViewMut2};
use num_traits::Zero;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// `floor(F[0] / df)` snaps to the nearest integer within this relative distance.
const OFFSET_SNAP_RTOL: f64 = 1e-9;

/// How the transform length `N` is derived from `1 / (dt * df)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformLengthRule {
    /// Round to the nearest integer.
    #[default]
    Round,
    /// Truncate toward zero.
    Truncate,
}

/// Phase factor applied to each transform bin to undo the lag-window offset `Q`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseCorrection {
    /// `exp(i2π (m*df + f_offset*df) Q / N)`, keyed on the requested frequency.
    #[default]
    FrequencyAxis,
    /// `exp(i2π (m + f_offset) Q / N)`, keyed on the unwrapped bin index.
    ///
    /// Exactly cancels the circular shift, so a real signal yields real rows.
    BinIndex,
}

/// Product formed between the two mirrored samples of each lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LagProduct {
    /// `x(t + τ) * x(t - τ)`.
    #[default]
    Bilinear,
    /// `x(t + τ) * conj(x(t - τ))`.
    Conjugate,
}

/// Constructor config for [`PseudoWignerKernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct PseudoWignerConfig {
    /// Time grid `T`.
    pub times: UniformGrid,
    /// Frequency grid `F`.
    pub freqs: UniformGrid,
    /// Transform length rounding rule.
    pub length_rule: TransformLengthRule,
    /// Phase correction convention.
    pub phase: PhaseCorrection,
    /// Lag product convention.
    pub lag_product: LagProduct,
}

impl PseudoWignerConfig {
    /// Config over the given grids with default conventions.
    pub fn new(times: UniformGrid, freqs: UniformGrid) -> Self {
        Self {
            times,
            freqs,
            length_rule: TransformLengthRule::default(),
            phase: PhaseCorrection::default(),
            lag_product: LagProduct::default(),
        }
    }
}

/// Trait-first pseudo Wigner distribution kernel.
///
/// All grid compatibility checks run in [`KernelLifecycle::try_new`], and the
/// forward FFT of length `N` is planned once and shared by every row.
#[derive(Clone)]
pub struct PseudoWignerKernel {
    times: UniformGrid,
    freqs: UniformGrid,
    dt: f64,
    df: f64,
    transform_len: usize,
    freq_offset: i64,
    phase: PhaseCorrection,
    lag_product: LagProduct,
    fft: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for PseudoWignerKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PseudoWignerKernel")
            .field("shape", &self.shape())
            .field("dt", &self.dt)
            .field("df", &self.df)
            .field("transform_len", &self.transform_len)
            .field("freq_offset", &self.freq_offset)
            .field("phase", &self.phase)
            .field("lag_product", &self.lag_product)
            .finish()
    }
}

/// Per-row buffers owned by one worker.
struct RowWorkspace {
    samples: Vec<Complex<f64>>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

/// `exp(i 2π x)`.
fn expi(x: f64) -> Complex<f64> {
    Complex::from_polar(1.0, 2.0 * core::f64::consts::PI * x)
}

fn transform_len(dt: f64, df: f64, rule: TransformLengthRule) -> Result<usize, ConfigError> {
    let bins = (1.0 / dt) * (1.0 / df);
    let n = match rule {
        TransformLengthRule::Round => bins.round(),
        TransformLengthRule::Truncate => bins.trunc(),
    };
    if !n.is_finite() || n < 1.0 || n > usize::MAX as f64 {
        return Err(ConfigError::TransformLength { bins });
    }
    Ok(n as usize)
}

fn freq_offset(f0: f64, df: f64) -> Result<i64, ConfigError> {
    let ratio = f0 / df;
    let nearest = ratio.round();
    let offset = if (ratio - nearest).abs() <= OFFSET_SNAP_RTOL * nearest.abs().max(1.0) {
        nearest
    } else {
        ratio.floor()
    };
    if !offset.is_finite() || offset.abs() > i64::MAX as f64 / 2.0 {
        return Err(ConfigError::InvalidArgument {
            arg: "freqs",
            reason: "frequency offset is not representable",
        });
    }
    Ok(offset as i64)
}

fn evaluate<S>(signal: &S, t: f64) -> Result<Complex<f64>, ExecInvariantViolation>
where
    S: Signal + ?Sized,
{
    let v = signal
        .sample(t)
        .map_err(|reason| ExecInvariantViolation::SignalFailure { time: t, reason })?;
    if !v.is_finite() {
        return Err(ExecInvariantViolation::NonFiniteSample { time: t });
    }
    Ok(v)
}

impl PseudoWignerKernel {
    /// Output shape `(len(T), len(F))`.
    pub fn shape(&self) -> (usize, usize) {
        (self.times.len(), self.freqs.len())
    }

    /// Transform length `N`, also the wraparound period of the frequency axis in bins.
    pub fn transform_len(&self) -> usize {
        self.transform_len
    }

    /// Bin index `floor(F[0] / df)` of the lowest requested frequency.
    pub fn freq_offset(&self) -> i64 {
        self.freq_offset
    }

    /// Time grid.
    pub fn times(&self) -> &UniformGrid {
        &self.times
    }

    /// Frequency grid.
    pub fn freqs(&self) -> &UniformGrid {
        &self.freqs
    }

    /// Lag-window half-width `Q = min(n, len(T) - 1 - n)` at time index `n`.
    pub fn half_width(&self, n: usize) -> usize {
        let last = self.times.len() - 1;
        n.min(last.saturating_sub(n))
    }

    fn workspace(&self) -> RowWorkspace {
        let max_window = 2 * self.half_width((self.times.len() - 1) / 2) + 1;
        RowWorkspace {
            samples: Vec::with_capacity(max_window),
            buffer: vec![Complex::zero(); self.transform_len],
            scratch: vec![Complex::zero(); self.fft.get_inplace_scratch_len()],
        }
    }

    fn fill_row<S>(
        &self,
        signal: &S,
        n: usize,
        ws: &mut RowWorkspace,
        out: &mut [Complex<f64>],
    ) -> Result<(), ExecInvariantViolation>
    where
        S: Signal + ?Sized,
    {
        let q_half = self.half_width(n);
        let t0 = self.times.first();

        // Sample j sits at lag j - Q; x_plus(q) is sample q, x_minus(q) is sample 2Q - q.
        ws.samples.clear();
        for j in 0..=2 * q_half {
            let t = (n + j - q_half) as f64 * self.dt + t0;
            ws.samples.push(evaluate(signal, t)?);
        }

        ws.buffer.fill(Complex::zero());
        let window = ws.samples.len();
        for q in 0..window {
            let plus = ws.samples[q];
            let minus = ws.samples[window - 1 - q];
            ws.buffer[q] = match self.lag_product {
                LagProduct::Bilinear => plus * minus,
                LagProduct::Conjugate => plus * minus.conj(),
            };
        }
        self.fft.process_with_scratch(&mut ws.buffer, &mut ws.scratch);

        let n_bins = self.transform_len as i64;
        let scale = 2.0 * self.dt;
        for (m, slot) in out.iter_mut().enumerate() {
            let unwrapped = m as i64 + self.freq_offset;
            let k = unwrapped.rem_euclid(n_bins) as usize;
            let cycles = match self.phase {
                PhaseCorrection::FrequencyAxis => {
                    (m as f64 * self.df + self.freq_offset as f64 * self.df) * q_half as f64
                        / self.transform_len as f64
                }
                PhaseCorrection::BinIndex => {
                    (unwrapped * q_half as i64).rem_euclid(n_bins) as f64
                        / self.transform_len as f64
                }
            };
            *slot = expi(cycles) * ws.buffer[k] * scale;
        }
        tracing::trace!(n, q_half, "computed pseudo Wigner row");
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn fill_rows<S>(
        &self,
        signal: &S,
        data: &mut [Complex<f64>],
    ) -> Result<(), ExecInvariantViolation>
    where
        S: Signal + ?Sized,
    {
        use rayon::prelude::*;

        let n_freq = self.freqs.len();
        data.par_chunks_mut(n_freq).enumerate().try_for_each_init(
            || self.workspace(),
            |ws, (n, row)| self.fill_row(signal, n, ws, row),
        )
    }

    #[cfg(not(feature = "parallel"))]
    fn fill_rows<S>(
        &self,
        signal: &S,
        data: &mut [Complex<f64>],
    ) -> Result<(), ExecInvariantViolation>
    where
        S: Signal + ?Sized,
    {
        let n_freq = self.freqs.len();
        let mut ws = self.workspace();
        for (n, row) in data.chunks_mut(n_freq).enumerate() {
            self.fill_row(signal, n, &mut ws, row)?;
        }
        Ok(())
    }
}

impl KernelLifecycle for PseudoWignerKernel {
    type Config = PseudoWignerConfig;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        let dt = config.times.step();
        let df = config.freqs.step();
        let transform_len = transform_len(dt, df, config.length_rule)?;

        let q_max = (config.times.len() - 1) / 2;
        let window = 2 * q_max + 1;
        if window > transform_len {
            return Err(ConfigError::WindowExceedsTransform {
                window,
                transform_len,
            });
        }

        let freq_offset = freq_offset(config.freqs.first(), df)?;
        let fft = FftPlanner::<f64>::new().plan_fft_forward(transform_len);

        tracing::debug!(
            n_times = config.times.len(),
            n_freqs = config.freqs.len(),
            dt,
            df,
            transform_len,
            freq_offset,
            max_window = window,
            "planned pseudo Wigner kernel"
        );

        Ok(Self {
            times: config.times,
            freqs: config.freqs,
            dt,
            df,
            transform_len,
            freq_offset,
            phase: config.phase,
            lag_product: config.lag_product,
            fft,
        })
    }
}

impl PseudoWigner2D for PseudoWignerKernel {
    fn run_into<S>(
        &self,
        signal: &S,
        out: &mut ArrayViewMut2<'_, Complex<f64>>,
    ) -> Result<(), ExecInvariantViolation>
    where
        S: Signal + ?Sized,
    {
        let (n_time, n_freq) = self.shape();
        if out.nrows() != n_time {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "out.rows",
                expected: n_time,
                got: out.nrows(),
            });
        }
        if out.ncols() != n_freq {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "out.cols",
                expected: n_freq,
                got: out.ncols(),
            });
        }
        match out.as_slice_mut() {
            Some(data) => self.fill_rows(signal, data),
            None => {
                let full = self.run_alloc(signal)?;
                out.assign(&full);
                Ok(())
            }
        }
    }

    fn run_alloc<S>(&self, signal: &S) -> Result<Array2<Complex<f64>>, ExecInvariantViolation>
    where
        S: Signal + ?Sized,
    {
        let (n_time, n_freq) = self.shape();
        let mut data = vec![Complex::zero(); n_time * n_freq];
        self.fill_rows(signal, &mut data)?;
        Array2::from_shape_vec((n_time, n_freq), data).map_err(|_| {
            ExecInvariantViolation::InvalidState {
                reason: "distribution buffer does not match grid shape",
            }
        })
    }

    fn run_row_into<S, O>(
        &self,
        signal: &S,
        n: usize,
        out: &mut O,
    ) -> Result<(), ExecInvariantViolation>
    where
        S: Signal + ?Sized,
        O: Write1D<Complex<f64>> + ?Sized,
    {
        if n >= self.times.len() {
            return Err(ExecInvariantViolation::InvalidState {
                reason: "time index lies outside the time grid",
            });
        }
        let out = out
            .write_slice_mut()
            .map_err(ExecInvariantViolation::from)?;
        if out.len() != self.freqs.len() {
            return Err(ExecInvariantViolation::LengthMismatch {
                arg: "out",
                expected: self.freqs.len(),
                got: out.len(),
            });
        }
        let mut ws = self.workspace();
        self.fill_row(signal, n, &mut ws, out)
    }

    fn run_row<S>(
        &self,
        signal: &S,
        n: usize,
    ) -> Result<Array1<Complex<f64>>, ExecInvariantViolation>
    where
        S: Signal + ?Sized,
    {
        let mut row = Array1::from_elem(self.freqs.len(), Complex::zero());
        self.run_row_into(signal, n, &mut row)?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::ShapeBuilder;

    fn grid(start: f64, stop: f64, step: f64) -> UniformGrid {
        UniformGrid::arange(start, stop, step).expect("valid grid")
    }

    fn small_kernel(phase: PhaseCorrection) -> PseudoWignerKernel {
        PseudoWignerKernel::try_new(PseudoWignerConfig {
            phase,
            ..PseudoWignerConfig::new(grid(0.0, 3.2, 0.1), grid(-2.5, 2.5, 0.078125))
        })
        .expect("valid config")
    }

    #[test]
    fn derives_transform_length_and_offset() {
        let kernel = PseudoWignerKernel::try_new(PseudoWignerConfig::new(
            grid(0.0, 30.0, 0.05),
            grid(-10.0, 10.0, 0.01),
        ))
        .expect("valid config");
        assert_eq!(kernel.transform_len(), 2000);
        assert_eq!(kernel.freq_offset(), -1000);
        assert_eq!(kernel.shape(), (600, 2000));
        assert_eq!(kernel.half_width(0), 0);
        assert_eq!(kernel.half_width(1), 1);
        assert_eq!(kernel.half_width(300), 299);
        assert_eq!(kernel.half_width(599), 0);
    }

    #[test]
    fn freq_offset_floors_off_grid_starts() {
        assert_eq!(freq_offset(-0.015, 0.01).expect("offset"), -2);
        assert_eq!(freq_offset(0.015, 0.01).expect("offset"), 1);
        assert_eq!(freq_offset(0.0, 0.25).expect("offset"), 0);
    }

    #[test]
    fn length_rule_controls_rounding() {
        // 1 / (0.3 * 0.3) = 11.11..., 1 / (0.2 * 0.3) = 16.66...
        assert_eq!(transform_len(0.3, 0.3, TransformLengthRule::Round), Ok(11));
        assert_eq!(transform_len(0.2, 0.3, TransformLengthRule::Round), Ok(17));
        assert_eq!(transform_len(0.2, 0.3, TransformLengthRule::Truncate), Ok(16));
        assert!(transform_len(2.0, 2.0, TransformLengthRule::Round).is_err());
    }

    #[test]
    fn rejects_window_wider_than_transform() {
        // N = round(1 / (0.1 * 1.0)) = 10, but 41 samples need a window of 41.
        let err = PseudoWignerKernel::try_new(PseudoWignerConfig::new(
            grid(0.0, 4.1, 0.1),
            grid(0.0, 5.0, 1.0),
        ))
        .expect_err("window exceeds transform");
        assert_eq!(
            err,
            ConfigError::WindowExceedsTransform {
                window: 41,
                transform_len: 10,
            }
        );
    }

    #[test]
    fn first_row_depends_only_on_first_sample() {
        let kernel = small_kernel(PhaseCorrection::FrequencyAxis);
        let a = |t: f64| (3.0 * t).sin() + 2.0;
        let b = |t: f64| if t == 0.0 { 2.0 } else { 1e6 * t };
        let ra = kernel.run_row(&a, 0).expect("row a");
        let rb = kernel.run_row(&b, 0).expect("row b");
        // Q = 0: a single product x(T[0])^2 spread flat over every bin.
        for (x, y) in ra.iter().zip(rb.iter()) {
            assert_abs_diff_eq!(x.re, y.re, epsilon = 1e-12);
            assert_abs_diff_eq!(x.im, y.im, epsilon = 1e-12);
            assert_abs_diff_eq!(x.norm(), 2.0 * 0.1 * 4.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn rows_match_full_matrix() {
        let kernel = small_kernel(PhaseCorrection::FrequencyAxis);
        let signal = |t: f64| (2.0 * core::f64::consts::PI * 0.7 * t).cos() * (-0.1 * t).exp();
        let full = kernel.run_alloc(&signal).expect("full matrix");
        for n in [0, 1, 7, 16, 30, 31] {
            let row = kernel.run_row(&signal, n).expect("single row");
            assert_eq!(row, full.row(n));
        }
    }

    #[test]
    fn matches_direct_summation_with_wrapped_bins() {
        // N = 20, f_offset = floor(-7.013 / 0.25) = -29, and 61 frequencies cover three
        // periods of the transform, so (m + f_offset) is both negative and >= N.
        let kernel = PseudoWignerKernel::try_new(PseudoWignerConfig::new(
            grid(0.0, 3.0, 0.2),
            grid(-7.013, 8.0, 0.25),
        ))
        .expect("valid config");
        assert_eq!(kernel.transform_len(), 20);
        assert_eq!(kernel.freq_offset(), -29);
        assert_eq!(kernel.shape(), (15, 61));

        let signal = |t: f64| {
            Complex::new(1.0 + 0.3 * t, 0.0) * expi(0.7 * t) + Complex::new(0.5, -0.2)
        };
        let x = kernel.run_alloc(&signal).expect("distribution");

        let times = kernel.times().samples();
        let freqs = kernel.freqs().samples();
        let (t0, dt, df) = (times[0], times[1] - times[0], freqs[1] - freqs[0]);
        let (n_fft, offset) = (20i64, -29i64);
        let bins = n_fft as f64;
        for n in 0..times.len() {
            let q_max = n.min(times.len() - 1 - n) as i64;
            let c1: Vec<Complex<f64>> = (0..=2 * q_max)
                .map(|q| {
                    let plus = (n as i64 + q - q_max) as f64 * dt + t0;
                    let minus = (n as i64 - q + q_max) as f64 * dt + t0;
                    signal(plus) * signal(minus)
                })
                .collect();
            for m in 0..freqs.len() {
                let k = (m as i64 + offset).rem_euclid(n_fft);
                let dft: Complex<f64> = c1
                    .iter()
                    .enumerate()
                    .map(|(j, c)| c * expi(-(((k * j as i64) % n_fft) as f64) / bins))
                    .sum();
                let cycles = (m as f64 * df + offset as f64 * df) * q_max as f64 / bins;
                let phase = expi(cycles);
                let expected = phase * dft * (2.0 * dt);
                assert_abs_diff_eq!(x[[n, m]].re, expected.re, epsilon = 1e-10);
                assert_abs_diff_eq!(x[[n, m]].im, expected.im, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn rows_write_into_matrix_row_views() {
        let kernel = small_kernel(PhaseCorrection::FrequencyAxis);
        let signal = |t: f64| (1.7 * t).sin() - 0.4;
        let mut out = Array2::from_elem(kernel.shape(), Complex::zero());
        for n in 0..kernel.shape().0 {
            kernel
                .run_row_into(&signal, n, &mut out.row_mut(n))
                .expect("contiguous row view");
        }
        assert_eq!(out, kernel.run_alloc(&signal).expect("alloc"));

        // Columns of a row-major matrix are strided.
        let err = kernel
            .run_row_into(&signal, 0, &mut out.column_mut(0))
            .expect_err("strided view");
        assert_eq!(
            err,
            ExecInvariantViolation::Config(ConfigError::NonContiguous {
                arg: "array_view_mut",
            })
        );
    }

    #[test]
    fn bin_index_phase_makes_real_signals_real() {
        let kernel = small_kernel(PhaseCorrection::BinIndex);
        let signal = |t: f64| (2.0 * core::f64::consts::PI * 0.4 * t).sin() + 0.3 * t;
        let x = kernel.run_alloc(&signal).expect("distribution");
        let peak = x.iter().map(|v| v.norm()).fold(0.0, f64::max);
        for v in x.iter() {
            assert!(v.im.abs() <= 1e-9 * peak, "imaginary residue {}", v.im);
        }
    }

    #[test]
    fn phase_conventions_share_magnitudes() {
        let signal = |t: f64| (2.0 * core::f64::consts::PI * 1.3 * t).cos();
        let a = small_kernel(PhaseCorrection::FrequencyAxis)
            .run_alloc(&signal)
            .expect("frequency axis");
        let b = small_kernel(PhaseCorrection::BinIndex)
            .run_alloc(&signal)
            .expect("bin index");
        for (x, y) in a.iter().zip(b.iter()) {
            assert_abs_diff_eq!(x.norm(), y.norm(), epsilon = 1e-9);
        }
    }

    #[test]
    fn run_into_checks_output_shape() {
        let kernel = small_kernel(PhaseCorrection::FrequencyAxis);
        let signal = |t: f64| t.cos();
        let (n_time, n_freq) = kernel.shape();

        let mut wrong = Array2::from_elem((n_time, n_freq - 1), Complex::zero());
        let err = kernel
            .run_into(&signal, &mut wrong.view_mut())
            .expect_err("mismatched output shape should error");
        assert!(matches!(
            err,
            ExecInvariantViolation::LengthMismatch { arg: "out.cols", .. }
        ));

        let mut out = Array2::from_elem((n_time, n_freq), Complex::zero());
        kernel
            .run_into(&signal, &mut out.view_mut())
            .expect("matching output shape");
        assert_eq!(out, kernel.run_alloc(&signal).expect("alloc"));

        // Column-major storage goes through the non-contiguous path.
        let mut fortran = Array2::from_elem((n_time, n_freq).f(), Complex::zero());
        kernel
            .run_into(&signal, &mut fortran.view_mut())
            .expect("fortran-order output");
        assert_eq!(fortran, out);
    }

    #[test]
    fn row_index_outside_grid_is_rejected() {
        let kernel = small_kernel(PhaseCorrection::FrequencyAxis);
        let signal = |t: f64| t;
        let err = kernel
            .run_row(&signal, kernel.shape().0)
            .expect_err("row out of range");
        assert!(matches!(err, ExecInvariantViolation::InvalidState { .. }));
    }

    #[test]
    fn non_finite_samples_name_the_time_argument() {
        let kernel = small_kernel(PhaseCorrection::FrequencyAxis);
        let signal = |t: f64| if t > 2.0 { f64::NAN } else { 1.0 };
        let err = kernel.run_alloc(&signal).expect_err("NaN sample");
        match err {
            ExecInvariantViolation::NonFiniteSample { time } => assert!(time > 2.0),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
