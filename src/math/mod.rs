//! Mathematical utilities: residual norms and small least-squares solves.

pub mod norm;
pub mod ols;

pub use norm::*;
pub use ols::*;
