//! Reporting utilities: fit summaries and formatted terminal output.

pub mod format;

pub use format::*;

use nalgebra::DMatrix;

use crate::domain::{CHANNELS, FitReport, ModelKind, NamedParam, Observations};
use crate::fit::{CurveFit, FitOptions};
use crate::math::NormKind;

/// `sqrt(H_ii)` for each diagonal entry of the inverse Hessian.
///
/// `None` where the entry is negative or not finite.
pub fn curvature_scales(hess_inv: &DMatrix<f64>) -> Vec<Option<f64>> {
    hess_inv
        .diagonal()
        .iter()
        .map(|&h| if h.is_finite() && h >= 0.0 { Some(h.sqrt()) } else { None })
        .collect()
}

/// Assemble the exportable summary of one fit.
pub fn build_fit_report(
    model: ModelKind,
    norm: NormKind,
    opts: &FitOptions,
    obs: &Observations,
    fit: &CurveFit,
    channel_norms: [f64; CHANNELS],
) -> FitReport {
    let scales = curvature_scales(&fit.hess_inv);
    let params = model
        .param_names()
        .iter()
        .zip(&fit.params)
        .zip(scales)
        .map(|((name, &value), curvature_scale)| NamedParam {
            name: name.to_string(),
            value,
            curvature_scale,
        })
        .collect();

    let hess_inv = fit
        .hess_inv
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect();

    FitReport {
        tool: "gfit".to_string(),
        model,
        norm,
        lagrange: opts.lagrange,
        tol: opts.tol,
        n_samples: obs.n_samples(),
        channels: obs.labels.clone(),
        origin: obs.origin,
        params,
        hess_inv,
        channel_norms,
        objective: fit.optimizer.fun,
        success: fit.success(),
        message: fit.optimizer.message().to_string(),
        nit: fit.optimizer.nit,
        nfev: fit.optimizer.nfev,
    }
}
