//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - parsed from the command line
//! - exported to JSON alongside a fit report

use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::math::NormKind;

/// Number of residual channels combined by the fitter.
///
/// The objective is `norm(channel 0) + lagrange * norm(channel 1)`; other
/// channel counts are not supported.
pub const CHANNELS: usize = 2;

/// Box constraint for one parameter. `None` leaves that side unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bound {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl Bound {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    pub fn free() -> Self {
        Self::default()
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower.unwrap_or(f64::NEG_INFINITY)
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper.unwrap_or(f64::INFINITY)
    }

    /// Clamp `v` into the box.
    pub fn project(&self, v: f64) -> f64 {
        v.max(self.lower_bound()).min(self.upper_bound())
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower_bound() && v <= self.upper_bound()
    }
}

/// Parses `lo:hi`, where either side may be empty (`0:`, `:10`, `:`).
impl FromStr for Bound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((lo, hi)) = s.split_once(':') else {
            return Err(format!("bound '{s}' must look like 'lo:hi' (either side may be empty)"));
        };
        let parse_side = |side: &str| -> Result<Option<f64>, String> {
            let side = side.trim();
            if side.is_empty() {
                return Ok(None);
            }
            side.parse::<f64>()
                .map(Some)
                .map_err(|e| format!("invalid bound value '{side}': {e}"))
        };
        Ok(Bound {
            lower: parse_side(lo)?,
            upper: parse_side(hi)?,
        })
    }
}

/// Built-in two-channel growth models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// `(a x, b x)`: one slope per channel.
    Linear,
    /// Doubling-time growth: cumulative `n0 2^(x/T)` and its daily rate.
    Exponential,
    /// Power law: cumulative `c x^k` and its derivative.
    PowerLaw,
}

impl ModelKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::Linear => "linear",
            ModelKind::Exponential => "exponential",
            ModelKind::PowerLaw => "power-law",
        }
    }

    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            ModelKind::Linear => &["a", "b"],
            ModelKind::Exponential => &["n0", "doubling"],
            ModelKind::PowerLaw => &["c", "k"],
        }
    }

    pub fn param_count(&self) -> usize {
        self.param_names().len()
    }
}

/// Two-channel observations ready for fitting.
///
/// `y` is interleaved: `y[2 i]` is channel 0 and `y[2 i + 1]` is channel 1 of
/// sample `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Observations {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Column names of the two channels.
    pub labels: [String; CHANNELS],
    /// Calendar date of `x = 0` when x was derived from a date column.
    pub origin: Option<NaiveDate>,
}

impl Observations {
    pub fn n_samples(&self) -> usize {
        self.x.len()
    }
}

/// Named fitted parameter for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedParam {
    pub name: String,
    pub value: f64,
    /// `sqrt(hess_inv[i][i])` when the diagonal entry is non-negative.
    pub curvature_scale: Option<f64>,
}

/// Portable summary of one fit, written by `gfit fit --export`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub tool: String,
    pub model: ModelKind,
    pub norm: NormKind,
    pub lagrange: f64,
    pub tol: f64,
    pub n_samples: usize,
    pub channels: [String; CHANNELS],
    pub origin: Option<NaiveDate>,
    pub params: Vec<NamedParam>,
    pub hess_inv: Vec<Vec<f64>>,
    pub channel_norms: [f64; CHANNELS],
    pub objective: f64,
    pub success: bool,
    pub message: String,
    pub nit: usize,
    pub nfev: usize,
}
