//! Mathematical utilities: grids, lines, cubic splines and nonlinear least squares.

pub mod grid;
pub mod line;
pub mod lm;
pub mod spline;

pub use grid::*;
pub use line::*;
pub use lm::*;
pub use spline::*;
