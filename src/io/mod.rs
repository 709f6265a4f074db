//! Input/output helpers.
//!
//! - CSV ingest (`ingest`)
//! - report JSON and observation CSV exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
