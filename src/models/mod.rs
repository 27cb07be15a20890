//! Closed-form curve models.
//!
//! Models are implemented as small, pure functions so that fitting/search code can
//! stay generic.

pub mod gompertz;

pub use gompertz::*;
