//! Input generation that does not come from a lab file.

pub mod sample;

pub use sample::*;
