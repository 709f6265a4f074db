//! Lagrange weight sweep.
//!
//! The right balance between the two channels is rarely known up front. A sweep
//! fits the same model and data once per candidate weight and tabulates how the
//! two channel residuals trade off against each other.
//!
//! Every fit is independent, so the candidates are evaluated in parallel.

use rayon::prelude::*;

use crate::domain::CHANNELS;
use crate::error::FitError;
use crate::fit::fitter::{FitOptions, WeightedObjective, curve_fit};
use crate::models::CurveModel;

/// Outcome of one weight in a sweep.
#[derive(Debug, Clone)]
pub struct SweepPoint {
    pub lagrange: f64,
    pub params: Vec<f64>,
    /// Reduced residual of each channel at the fitted parameters.
    pub channel_norms: [f64; CHANNELS],
    /// `channel_norms[0] + lagrange * channel_norms[1]`.
    pub objective: f64,
    pub success: bool,
}

/// Fit once per entry of `lagrange_values`, in parallel.
///
/// `base` supplies everything except the weight; verbose output is suppressed.
/// Results keep the order of `lagrange_values`. The first failing fit aborts
/// the sweep with its error.
pub fn sweep_lagrange<X, M>(
    model: &M,
    xdata: &X,
    ydata: &[f64],
    p0: &[f64],
    base: &FitOptions,
    lagrange_values: &[f64],
) -> Result<Vec<SweepPoint>, FitError>
where
    X: ?Sized + Sync,
    M: CurveModel<X> + Sync,
{
    if lagrange_values.is_empty() {
        return Err(FitError::InvalidInput("lagrange sweep needs at least one value".to_string()));
    }

    lagrange_values
        .par_iter()
        .map(|&lagrange| {
            let opts = FitOptions {
                lagrange,
                verbose: false,
                ..base.clone()
            };
            let fit = curve_fit(model, xdata, ydata, p0, &opts)?;
            let objective = WeightedObjective::new(model, xdata, ydata, lagrange, opts.norm)?;
            let channel_norms = objective.channel_norms(&fit.params)?;
            Ok(SweepPoint {
                lagrange,
                success: fit.success(),
                objective: fit.optimizer.fun,
                channel_norms,
                params: fit.params,
            })
        })
        .collect()
}
