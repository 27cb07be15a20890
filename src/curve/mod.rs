//! Compressibility-curve preparation shared by the determination methods.
//!
//! - isolate the loading path (`selection`)
//! - interpolate it smoothly and sample it densely (`fitted`)
//! - bound the virgin-branch searches at the first inflection (`inflection`)

pub mod fitted;
pub mod inflection;
pub mod selection;

pub use fitted::*;
pub use inflection::*;
pub use selection::*;
