//! Nonlinear regression of closed-form models onto compressibility curves.

pub mod gompertz;

pub use gompertz::*;
