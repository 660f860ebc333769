use core::fmt;

/// Validation errors raised at kernel construction or adapter binding time.
///
/// Every variant is detected before the signal is evaluated, so a kernel that
/// fails here never produces a partial result.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required input or configuration field is empty.
    EmptyInput {
        /// Name of the argument that is empty.
        arg: &'static str,
    },
    /// A configuration argument value is invalid.
    InvalidArgument {
        /// Name of the argument.
        arg: &'static str,
        /// Human readable reason.
        reason: &'static str,
    },
    /// A contiguous 1D slice view could not be obtained.
    NonContiguous {
        /// Name of the argument that is non-contiguous.
        arg: &'static str,
    },
    /// A grid step deviates from the grid's first step.
    NonUniformGrid {
        /// Name of the grid.
        arg: &'static str,
        /// Index `i` of the offending step `x[i+1] - x[i]`.
        index: usize,
        /// Step implied by the first two samples.
        expected: f64,
        /// Step found at `index`.
        got: f64,
    },
    /// A matrix argument does not have the shape implied by its grids.
    ShapeMismatch {
        /// Name of the argument.
        arg: &'static str,
        /// Required `(rows, cols)`.
        expected: (usize, usize),
        /// Received `(rows, cols)`.
        got: (usize, usize),
    },
    /// The grid resolutions imply a transform length below one bin.
    TransformLength {
        /// Unrounded `1 / (dt * df)`.
        bins: f64,
    },
    /// The widest lag window does not fit in the transform.
    WindowExceedsTransform {
        /// `2 * Q_max + 1`.
        window: usize,
        /// Derived transform length.
        transform_len: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyInput { arg } => write!(f, "Input `{arg}` was empty."),
            ConfigError::InvalidArgument { arg, reason } => {
                write!(f, "Invalid argument `{arg}`: {reason}")
            }
            ConfigError::NonContiguous { arg } => {
                write!(f, "Argument `{arg}` is not contiguous in memory.")
            }
            ConfigError::NonUniformGrid {
                arg,
                index,
                expected,
                got,
            } => write!(
                f,
                "Grid `{arg}` is not uniform at step {index}. Expected {expected}, got {got}."
            ),
            ConfigError::ShapeMismatch { arg, expected, got } => write!(
                f,
                "Argument `{arg}` has shape {got:?}; expected {expected:?}."
            ),
            ConfigError::TransformLength { bins } => write!(
                f,
                "Grid resolutions imply {bins} transform bins; at least one is required."
            ),
            ConfigError::WindowExceedsTransform {
                window,
                transform_len,
            } => write!(
                f,
                "Lag window of {window} samples exceeds transform length {transform_len}."
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Runtime execution invariant violations for checked kernel entrypoints.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecInvariantViolation {
    /// An execution precondition was violated.
    InvalidState {
        /// Human readable reason.
        reason: &'static str,
    },
    /// Output length mismatched the expected runtime shape.
    LengthMismatch {
        /// Name of the argument.
        arg: &'static str,
        /// Required length.
        expected: usize,
        /// Received length.
        got: usize,
    },
    /// The signal function reported a failure at a required time argument.
    SignalFailure {
        /// Time argument the signal was evaluated at.
        time: f64,
        /// Failure reported by the signal.
        reason: String,
    },
    /// The signal function returned a NaN or infinite value.
    NonFiniteSample {
        /// Time argument the signal was evaluated at.
        time: f64,
    },
    /// Adapter binding/configuration failure.
    Config(ConfigError),
}

impl From<ConfigError> for ExecInvariantViolation {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl fmt::Display for ExecInvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecInvariantViolation::InvalidState { reason } => {
                write!(f, "Execution invariant violation: {reason}")
            }
            ExecInvariantViolation::LengthMismatch { arg, expected, got } => {
                write!(
                    f,
                    "Execution length mismatch on `{arg}`. Expected {expected}, got {got}."
                )
            }
            ExecInvariantViolation::SignalFailure { time, reason } => {
                write!(f, "Signal evaluation failed at t = {time}: {reason}")
            }
            ExecInvariantViolation::NonFiniteSample { time } => {
                write!(f, "Signal returned a non-finite value at t = {time}")
            }
            ExecInvariantViolation::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ExecInvariantViolation {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecInvariantViolation::Config(err) => Some(err),
            _ => None,
        }
    }
}
