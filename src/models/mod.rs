//! Growth model implementations.
//!
//! Models are implemented as small, pure functions so that the fitting code can
//! stay generic over any `CurveModel`.

pub mod model;

pub use model::*;
