//! Curve fitting.
//!
//! Responsibilities:
//!
//! - build the weighted two-channel objective
//! - run the bound-constrained minimizer on it
//! - sweep the Lagrange weight (parallel)

pub mod fitter;
pub mod sweep;

pub use fitter::*;
pub use sweep::*;
