//! Helper utilities for integration tests.

pub mod assertions;
pub mod number_toolkit;

pub use assertions::*;
pub use number_toolkit::*;
