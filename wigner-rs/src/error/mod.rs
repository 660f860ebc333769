use core::{error, fmt};

use crate::kernel::{ConfigError, ExecInvariantViolation};

/// Errors raised whilst computing a distribution through the free-function API.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Grids or options are invalid or incompatible with each other. Raised
    /// before the signal is evaluated.
    Configuration(ConfigError),
    /// The signal could not be evaluated at a required time argument.
    Domain {
        /// Offending time argument.
        time: f64,
        /// Explaining why the sample is unusable.
        reason: String,
    },
    /// Execution was attempted with a violated kernel invariant.
    ExecInvariantViolation {
        /// Why execution could not proceed.
        reason: String,
    },
}

/// Result alias for the free-function API.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(err) => write!(f, "Configuration error: {err}"),
            Error::Domain { time, reason } => {
                write!(f, "Domain error at t = {time}: {reason}")
            }
            Error::ExecInvariantViolation { reason } => {
                write!(f, "Execution invariant violation: {reason}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Configuration(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(value: ConfigError) -> Self {
        Error::Configuration(value)
    }
}

impl From<ExecInvariantViolation> for Error {
    fn from(value: ExecInvariantViolation) -> Self {
        match value {
            ExecInvariantViolation::Config(err) => Error::Configuration(err),
            ExecInvariantViolation::SignalFailure { time, reason } => {
                Error::Domain { time, reason }
            }
            ExecInvariantViolation::NonFiniteSample { time } => Error::Domain {
                time,
                reason: "signal returned a non-finite value".to_string(),
            },
            other => Error::ExecInvariantViolation {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_violations_become_domain_errors() {
        let err = Error::from(ExecInvariantViolation::NonFiniteSample { time: -0.5 });
        assert!(matches!(err, Error::Domain { time, .. } if time == -0.5));

        let err = Error::from(ExecInvariantViolation::SignalFailure {
            time: 2.0,
            reason: "out of range".to_string(),
        });
        assert_eq!(
            err,
            Error::Domain {
                time: 2.0,
                reason: "out of range".to_string()
            }
        );
    }

    #[test]
    fn config_violations_become_configuration_errors() {
        let err = Error::from(ExecInvariantViolation::Config(
            ConfigError::TransformLength { bins: 0.25 },
        ));
        assert_eq!(
            err,
            Error::Configuration(ConfigError::TransformLength { bins: 0.25 })
        );
    }
}
