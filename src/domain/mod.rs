//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - parameter box constraints (`Bound`)
//! - the built-in model catalogue (`ModelKind`)
//! - two-channel observations (`Observations`)
//! - exportable fit summaries (`FitReport`)

pub mod types;

pub use types::*;
