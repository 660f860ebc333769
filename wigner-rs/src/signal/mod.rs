//! Time-frequency analysis of continuous-time signals.

pub mod source;
pub mod traits;
pub mod wigner;

pub use source::{Signal, SignalValue};
