//! Two-channel model functions.
//!
//! The fitter relies on a single primitive: map `(x, params)` to a flat array of
//! predictions with two interleaved channels (`out[2 i]` is channel 0 and
//! `out[2 i + 1]` channel 1 of sample `i`).
//!
//! Any closure `Fn(&X, &[f64]) -> Vec<f64>` is a model. The built-in growth
//! models (`ModelKind`) additionally know how to guess a starting point.

use std::f64::consts::LN_2;

use crate::domain::{CHANNELS, ModelKind};
use crate::error::FitError;
use crate::math::{fit_line, fit_through_origin};

/// A parametric model producing interleaved two-channel predictions.
pub trait CurveModel<X: ?Sized> {
    fn eval(&self, x: &X, params: &[f64]) -> Result<Vec<f64>, FitError>;
}

impl<X, F> CurveModel<X> for F
where
    X: ?Sized,
    F: Fn(&X, &[f64]) -> Vec<f64>,
{
    fn eval(&self, x: &X, params: &[f64]) -> Result<Vec<f64>, FitError> {
        Ok(self(x, params))
    }
}

impl CurveModel<[f64]> for ModelKind {
    fn eval(&self, x: &[f64], params: &[f64]) -> Result<Vec<f64>, FitError> {
        if params.len() != self.param_count() {
            return Err(FitError::Model(format!(
                "{} model takes {} parameters, got {}",
                self.display_name(),
                self.param_count(),
                params.len()
            )));
        }
        Ok(predict(*self, x, params))
    }
}

/// Evaluate both channels at a single point.
///
/// # Panics
/// Panics if `params` is shorter than `model.param_count()`.
pub fn predict_point(model: ModelKind, x: f64, params: &[f64]) -> [f64; CHANNELS] {
    match model {
        ModelKind::Linear => [params[0] * x, params[1] * x],
        ModelKind::Exponential => {
            let (n0, doubling) = (params[0], params[1]);
            let total = n0 * (x / doubling).exp2();
            [total, total * LN_2 / doubling]
        }
        ModelKind::PowerLaw => {
            let (c, k) = (params[0], params[1]);
            [c * x.powf(k), c * k * x.powf(k - 1.0)]
        }
    }
}

/// Interleaved predictions for every `x`.
pub fn predict(model: ModelKind, x: &[f64], params: &[f64]) -> Vec<f64> {
    x.iter().flat_map(|&xi| predict_point(model, xi, params)).collect()
}

/// Data-driven starting point for the built-in models.
///
/// - linear: per-channel slope through the origin
/// - exponential: log-linear fit of channel 0 (`log2 N = log2 n0 + x / T`)
/// - power law: log-log fit of channel 0 (`ln N = ln c + k ln x`)
///
/// Returns `None` when the data cannot support a guess (too few positive
/// samples, flat or decaying series for the exponential).
pub fn initial_guess(model: ModelKind, x: &[f64], y: &[f64]) -> Option<Vec<f64>> {
    if y.len() != x.len() * CHANNELS {
        return None;
    }
    let ch0: Vec<f64> = y.iter().step_by(CHANNELS).copied().collect();
    let ch1: Vec<f64> = y.iter().skip(1).step_by(CHANNELS).copied().collect();

    match model {
        ModelKind::Linear => {
            let a = fit_through_origin(x, &ch0)?;
            let b = fit_through_origin(x, &ch1)?;
            Some(vec![a, b])
        }
        ModelKind::Exponential => {
            let (xs, logs): (Vec<f64>, Vec<f64>) = x
                .iter()
                .zip(&ch0)
                .filter(|(_, v)| **v > 0.0)
                .map(|(&xi, &v)| (xi, v.log2()))
                .unzip();
            let (intercept, slope) = fit_line(&xs, &logs)?;
            if !(slope > 0.0) {
                return None;
            }
            Some(vec![intercept.exp2(), 1.0 / slope])
        }
        ModelKind::PowerLaw => {
            let (logx, logy): (Vec<f64>, Vec<f64>) = x
                .iter()
                .zip(&ch0)
                .filter(|(xi, v)| **xi > 0.0 && **v > 0.0)
                .map(|(&xi, &v)| (xi.ln(), v.ln()))
                .unzip();
            let (intercept, slope) = fit_line(&logx, &logy)?;
            Some(vec![intercept.exp(), slope])
        }
    }
}
