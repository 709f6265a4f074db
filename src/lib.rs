//! `growth-fit` library crate.
//!
//! The binary (`gfit`) is a thin wrapper around this library so that:
//!
//! - the fitter and the minimizer are testable without spawning processes
//! - `curve_fit` can be called directly with any closure as the model

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod optimize;
pub mod report;

pub use error::{AppError, FitError};
pub use fit::{CurveFit, FitOptions, curve_fit, curve_fit_with};
pub use math::Norm;
