//! Command-line parsing for the two-channel growth curve fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting code. Handlers live in `crate::app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Bound, ModelKind};
use crate::math::NormKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "gfit", version, about = "Weighted two-channel growth curve fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a model to a CSV, print the summary, and optionally export JSON.
    Fit(FitArgs),
    /// Fit once per Lagrange weight and tabulate the channel trade-off.
    Sweep(SweepArgs),
    /// Write a synthetic two-channel CSV drawn from a model.
    Simulate(SimulateArgs),
    /// Print the summary of a report exported by `fit --export`.
    Show(ShowArgs),
}

/// Input columns shared by `fit` and `sweep`.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// CSV file with a header row.
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    /// Numeric x column.
    #[arg(long, default_value = "x", conflicts_with = "date_col")]
    pub x_col: String,

    /// ISO date column (`YYYY-MM-DD`) used as x, in days from the first row.
    #[arg(long)]
    pub date_col: Option<String>,

    /// First channel column.
    #[arg(long, default_value = "y0")]
    pub y0_col: String,

    /// Second channel column.
    #[arg(long, default_value = "y1")]
    pub y1_col: String,
}

/// Model and optimizer options shared by `fit` and `sweep`.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Model to fit.
    #[arg(long, value_enum, default_value_t = ModelKind::Exponential)]
    pub model: ModelKind,

    /// Initial guess, comma separated. Estimated from the data when omitted.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub p0: Option<Vec<f64>>,

    /// Per-parameter bounds as `lo:hi`, comma separated. Either side may be empty.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub bounds: Option<Vec<Bound>>,

    /// Residual norm applied to each channel.
    #[arg(long, value_enum, default_value_t = NormKind::L2)]
    pub norm: NormKind,

    /// Minimizer tolerance.
    #[arg(long, default_value_t = 1e-13)]
    pub tol: f64,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Weight of the second channel.
    #[arg(long, default_value_t = 1.0)]
    pub lagrange: f64,

    /// Do not print the minimizer diagnostics to stderr.
    #[arg(short, long)]
    pub quiet: bool,

    /// Export the fit report to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Lagrange weights to try, comma separated.
    #[arg(long, value_delimiter = ',', default_value = "0.1,0.5,1,2,10")]
    pub lagrange: Vec<f64>,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Model to draw from.
    #[arg(long, value_enum, default_value_t = ModelKind::Exponential)]
    pub model: ModelKind,

    /// True parameters, comma separated.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub params: Vec<f64>,

    /// Number of samples.
    #[arg(short = 'n', long, default_value_t = 30)]
    pub samples: usize,

    /// First x value.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub x_start: f64,

    /// Spacing between x values.
    #[arg(long, default_value_t = 1.0)]
    pub x_step: f64,

    /// Log-scale multiplicative noise level.
    #[arg(long, default_value_t = 0.05)]
    pub noise: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV.
    #[arg(short, long, value_name = "CSV")]
    pub output: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Report JSON written by `fit --export`.
    #[arg(long, value_name = "JSON")]
    pub report: PathBuf,
}
