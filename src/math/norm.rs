//! Residual norms.
//!
//! A norm reduces one channel's residual array to a single non-negative scalar.
//! Both built-ins are *means*, so channels with different sample counts stay
//! comparable:
//!
//! - `L1(r) = mean(|r_i|)`
//! - `L2(r) = sqrt(mean(r_i^2))` (root-mean-square)
//!
//! An empty residual array reduces to `0`.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Mean absolute value.
pub fn l1(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }
    residuals.iter().map(|r| r.abs()).sum::<f64>() / residuals.len() as f64
}

/// Root-mean-square.
pub fn l2(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }
    (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt()
}

/// Reduction applied to each channel's residuals.
#[derive(Debug, Clone, Copy, Default)]
pub enum Norm {
    L1,
    #[default]
    L2,
    /// Caller-supplied reduction. Must return a non-negative scalar.
    Custom(fn(&[f64]) -> f64),
}

impl Norm {
    pub fn apply(&self, residuals: &[f64]) -> f64 {
        match self {
            Norm::L1 => l1(residuals),
            Norm::L2 => l2(residuals),
            Norm::Custom(f) => f(residuals),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Norm::L1 => "L1",
            Norm::L2 => "L2",
            Norm::Custom(_) => "custom",
        }
    }
}

/// Built-in norms selectable from the command line and stored in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NormKind {
    L1,
    L2,
}

impl From<NormKind> for Norm {
    fn from(kind: NormKind) -> Self {
        match kind {
            NormKind::L1 => Norm::L1,
            NormKind::L2 => Norm::L2,
        }
    }
}
