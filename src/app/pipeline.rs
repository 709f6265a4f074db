//! Shared "fit pipeline" logic used by the `fit` and `sweep` commands.
//!
//! load CSV -> choose starting point -> fit (or sweep) -> report
//!
//! The handlers in `crate::app` only deal with printing and exports.

use std::path::PathBuf;

use crate::domain::{Bound, FitReport, ModelKind, Observations};
use crate::error::AppError;
use crate::fit::{CurveFit, FitOptions, SweepPoint, WeightedObjective, curve_fit, sweep_lagrange};
use crate::io::{ColumnSpec, load_observations};
use crate::math::NormKind;
use crate::models::initial_guess;

/// Everything a fit run needs, resolved from the CLI.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub csv: PathBuf,
    pub columns: ColumnSpec,
    pub model: ModelKind,
    pub p0: Option<Vec<f64>>,
    pub bounds: Option<Vec<Bound>>,
    pub norm: NormKind,
    pub lagrange: f64,
    pub tol: f64,
    pub verbose: bool,
}

impl RunConfig {
    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            lagrange: self.lagrange,
            norm: self.norm.into(),
            bounds: self.bounds.clone(),
            tol: self.tol,
            verbose: self.verbose,
        }
    }
}

/// All computed outputs of a single `gfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub observations: Observations,
    pub p0: Vec<f64>,
    pub fit: CurveFit,
    pub report: FitReport,
}

/// Load the CSV named by `config` and fit it.
pub fn run_fit(config: &RunConfig) -> Result<RunOutput, AppError> {
    let observations = load_observations(&config.csv, &config.columns)?;
    run_fit_on(config, observations)
}

/// Fit already-loaded observations.
pub fn run_fit_on(config: &RunConfig, observations: Observations) -> Result<RunOutput, AppError> {
    check_domain(config.model, &observations)?;
    let p0 = resolve_p0(config.model, &observations, config.p0.as_deref())?;
    let opts = config.fit_options();

    let fit = curve_fit(&config.model, observations.x.as_slice(), &observations.y, &p0, &opts)?;

    let objective = WeightedObjective::new(
        &config.model,
        observations.x.as_slice(),
        &observations.y,
        opts.lagrange,
        opts.norm,
    )?;
    let channel_norms = objective.channel_norms(&fit.params)?;
    let report = crate::report::build_fit_report(config.model, config.norm, &opts, &observations, &fit, channel_norms);

    Ok(RunOutput {
        observations,
        p0,
        fit,
        report,
    })
}

/// Load the CSV named by `config` and fit it once per weight.
pub fn run_sweep(config: &RunConfig, weights: &[f64]) -> Result<(Observations, Vec<SweepPoint>), AppError> {
    let observations = load_observations(&config.csv, &config.columns)?;
    let points = run_sweep_on(config, &observations, weights)?;
    Ok((observations, points))
}

pub fn run_sweep_on(config: &RunConfig, observations: &Observations, weights: &[f64]) -> Result<Vec<SweepPoint>, AppError> {
    check_domain(config.model, observations)?;
    let p0 = resolve_p0(config.model, observations, config.p0.as_deref())?;
    let points = sweep_lagrange(
        &config.model,
        observations.x.as_slice(),
        &observations.y,
        &p0,
        &config.fit_options(),
        weights,
    )?;
    Ok(points)
}

/// Use the explicit guess when given, otherwise estimate one from the data.
pub fn resolve_p0(model: ModelKind, obs: &Observations, p0: Option<&[f64]>) -> Result<Vec<f64>, AppError> {
    match p0 {
        Some(p0) => {
            if p0.len() != model.param_count() {
                return Err(AppError::new(
                    2,
                    format!(
                        "--p0 has {} values but the {} model takes {} ({})",
                        p0.len(),
                        model.display_name(),
                        model.param_count(),
                        model.param_names().join(", ")
                    ),
                ));
            }
            Ok(p0.to_vec())
        }
        None => initial_guess(model, &obs.x, &obs.y).ok_or_else(|| {
            AppError::new(
                2,
                format!(
                    "Could not estimate a starting point for the {} model; pass --p0",
                    model.display_name()
                ),
            )
        }),
    }
}

fn check_domain(model: ModelKind, obs: &Observations) -> Result<(), AppError> {
    if model == ModelKind::PowerLaw && obs.x.iter().any(|&x| x <= 0.0) {
        return Err(AppError::new(2, "The power-law model needs every x > 0."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::XColumn;
    use crate::models::predict;
    use approx::assert_abs_diff_eq;

    fn config(model: ModelKind) -> RunConfig {
        RunConfig {
            csv: PathBuf::from("unused.csv"),
            columns: ColumnSpec {
                x: XColumn::Numeric("x".to_string()),
                y0: "y0".to_string(),
                y1: "y1".to_string(),
            },
            model,
            p0: None,
            bounds: None,
            norm: NormKind::L2,
            lagrange: 1.0,
            tol: 1e-13,
            verbose: false,
        }
    }

    fn observations(model: ModelKind, params: &[f64], x: Vec<f64>) -> Observations {
        let y = predict(model, &x, params);
        Observations {
            x,
            y,
            labels: ["y0".to_string(), "y1".to_string()],
            origin: None,
        }
    }

    #[test]
    fn fit_recovers_linear_model_from_estimated_start() {
        let obs = observations(ModelKind::Linear, &[2.0, 3.0], vec![1.0, 2.0, 3.0]);
        let out = run_fit_on(&config(ModelKind::Linear), obs).unwrap();
        assert_abs_diff_eq!(out.fit.params[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out.fit.params[1], 3.0, epsilon = 1e-6);
        assert_eq!(out.report.params[0].name, "a");
        assert_eq!(out.report.n_samples, 3);
        assert_eq!(out.report.hess_inv.len(), 2);
    }

    #[test]
    fn explicit_p0_must_match_model() {
        let obs = observations(ModelKind::Linear, &[2.0, 3.0], vec![1.0, 2.0]);
        let err = resolve_p0(ModelKind::Linear, &obs, Some(&[1.0])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(resolve_p0(ModelKind::Linear, &obs, Some(&[1.0, 1.0])).unwrap(), vec![1.0, 1.0]);
    }

    #[test]
    fn power_law_rejects_non_positive_x() {
        let obs = observations(ModelKind::Linear, &[1.0, 1.0], vec![0.0, 1.0, 2.0]);
        let err = run_fit_on(&config(ModelKind::PowerLaw), obs).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn sweep_returns_one_point_per_weight() {
        let mut cfg = config(ModelKind::Linear);
        cfg.p0 = Some(vec![1.0, 1.0]);
        let obs = observations(ModelKind::Linear, &[2.0, 3.0], vec![1.0, 2.0, 3.0]);
        let points = run_sweep_on(&cfg, &obs, &[0.5, 2.0]).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].lagrange, 2.0);
    }
}
