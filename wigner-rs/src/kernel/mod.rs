//! Shared trait-first kernel substrate.
//!
//! This module defines the constructor validation lifecycle, the 1D buffer
//! adapters, and the error types used by the distribution and rendering
//! kernels.

mod errors;
mod io;
mod lifecycle;

pub use errors::*;
pub use io::*;
pub use lifecycle::*;
