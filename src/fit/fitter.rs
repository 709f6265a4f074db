//! Weighted two-channel curve fitting.
//!
//! Given:
//! - a model `f(x, p)` producing interleaved two-channel predictions
//! - observed data `y` in the same layout
//! - a starting guess `p0` and optional per-parameter bounds
//!
//! we minimize
//!
//! ```text
//! J(p) = norm(f_0(x, p) - y_0) + lagrange * norm(f_1(x, p) - y_1)
//! ```
//!
//! with a bound-constrained L-BFGS minimizer and return the fitted parameters
//! together with the minimizer's inverse-Hessian estimate.

use nalgebra::DMatrix;

use crate::domain::{Bound, CHANNELS};
use crate::error::FitError;
use crate::math::Norm;
use crate::models::CurveModel;
use crate::optimize::{BoundedMinimizer, Lbfgsb, OptimizeResult};

/// Fitting options. Values are fixed for the duration of one call.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Weight of the second channel's norm. Must be finite and `>= 0`.
    pub lagrange: f64,
    /// Reduction applied to each channel's residuals.
    pub norm: Norm,
    /// One bound per parameter, or `None` for an unconstrained search.
    pub bounds: Option<Vec<Bound>>,
    /// Function-value and projected-gradient tolerance of the minimizer.
    pub tol: f64,
    /// Print the minimizer result and the objective at `p0` to stderr.
    pub verbose: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            lagrange: 1.0,
            norm: Norm::L2,
            bounds: None,
            tol: 1e-13,
            verbose: true,
        }
    }
}

/// Result of `curve_fit`.
#[derive(Debug, Clone)]
pub struct CurveFit {
    /// Fitted parameter vector.
    pub params: Vec<f64>,
    /// Approximate inverse Hessian of the objective at `params`.
    pub hess_inv: DMatrix<f64>,
    /// Full minimizer outcome. A non-converged run still lands here.
    pub optimizer: OptimizeResult,
}

impl CurveFit {
    pub fn success(&self) -> bool {
        self.optimizer.success()
    }
}

/// Split an interleaved array into its channels.
pub fn split_channels(flat: &[f64]) -> Result<[Vec<f64>; CHANNELS], FitError> {
    if flat.len() % CHANNELS != 0 {
        return Err(FitError::ShapeMismatch {
            len: flat.len(),
            channels: CHANNELS,
        });
    }
    Ok(std::array::from_fn(|c| {
        flat.iter().skip(c).step_by(CHANNELS).copied().collect()
    }))
}

/// The scalar objective `J(p)` for one model and data set.
pub struct WeightedObjective<'a, X: ?Sized, M> {
    model: &'a M,
    xdata: &'a X,
    ydata: &'a [f64],
    lagrange: f64,
    norm: Norm,
}

impl<'a, X, M> WeightedObjective<'a, X, M>
where
    X: ?Sized,
    M: CurveModel<X>,
{
    /// Bind a model and data set.
    ///
    /// Fails with `ShapeMismatch` when `ydata` does not split into two channels.
    pub fn new(model: &'a M, xdata: &'a X, ydata: &'a [f64], lagrange: f64, norm: Norm) -> Result<Self, FitError> {
        if ydata.is_empty() || ydata.len() % CHANNELS != 0 {
            return Err(FitError::ShapeMismatch {
                len: ydata.len(),
                channels: CHANNELS,
            });
        }
        if !(lagrange.is_finite() && lagrange >= 0.0) {
            return Err(FitError::InvalidInput(format!(
                "lagrange weight must be finite and >= 0, got {lagrange}"
            )));
        }
        Ok(Self {
            model,
            xdata,
            ydata,
            lagrange,
            norm,
        })
    }

    /// Reduced residual of each channel at `params`.
    pub fn channel_norms(&self, params: &[f64]) -> Result<[f64; CHANNELS], FitError> {
        let predicted = self.model.eval(self.xdata, params)?;
        if predicted.len() != self.ydata.len() {
            return Err(FitError::LengthMismatch {
                expected: self.ydata.len(),
                actual: predicted.len(),
            });
        }

        let residuals: Vec<f64> = predicted.iter().zip(self.ydata).map(|(p, y)| p - y).collect();
        let channels = split_channels(&residuals)?;
        Ok(channels.map(|r| self.norm.apply(&r)))
    }

    /// `J(params)`.
    pub fn evaluate(&self, params: &[f64]) -> Result<f64, FitError> {
        let terms = self.channel_norms(params)?;
        self.combine(&terms)
    }

    fn combine(&self, terms: &[f64]) -> Result<f64, FitError> {
        match terms {
            [first, second] => Ok(first + self.lagrange * second),
            _ => Err(FitError::InvariantViolation(format!(
                "objective combines exactly {CHANNELS} channels, got {}",
                terms.len()
            ))),
        }
    }
}

/// Fit `model` to `ydata` with the default L-BFGS minimizer.
///
/// See `curve_fit_with`.
pub fn curve_fit<X, M>(
    model: &M,
    xdata: &X,
    ydata: &[f64],
    p0: &[f64],
    opts: &FitOptions,
) -> Result<CurveFit, FitError>
where
    X: ?Sized,
    M: CurveModel<X>,
{
    curve_fit_with(&Lbfgsb::default(), model, xdata, ydata, p0, opts)
}

/// Fit `model` to `ydata` starting from `p0` using `minimizer`.
///
/// Input shape is checked before the model is evaluated. Errors from the model
/// propagate unchanged. A run that stops without meeting the tolerance is not an
/// error: inspect `CurveFit::optimizer` for its status.
///
/// `opts.tol` replaces the minimizer's own convergence tolerances for this call.
pub fn curve_fit_with<O, X, M>(
    minimizer: &O,
    model: &M,
    xdata: &X,
    ydata: &[f64],
    p0: &[f64],
    opts: &FitOptions,
) -> Result<CurveFit, FitError>
where
    O: BoundedMinimizer,
    X: ?Sized,
    M: CurveModel<X>,
{
    let objective = WeightedObjective::new(model, xdata, ydata, opts.lagrange, opts.norm)?;
    if p0.is_empty() {
        return Err(FitError::InvalidInput("initial guess p0 is empty".to_string()));
    }
    let bounds: &[Bound] = opts.bounds.as_deref().unwrap_or(&[]);
    if !bounds.is_empty() && bounds.len() != p0.len() {
        return Err(FitError::InvalidInput(format!(
            "got {} bounds for {} parameters",
            bounds.len(),
            p0.len()
        )));
    }
    if !(opts.tol.is_finite() && opts.tol >= 0.0) {
        return Err(FitError::InvalidInput(format!("tol must be finite and >= 0, got {}", opts.tol)));
    }

    let minimizer = minimizer.with_tolerance(opts.tol);
    let result = minimizer.minimize(|p: &[f64]| objective.evaluate(p), p0, bounds)?;

    if opts.verbose {
        eprintln!("{}", crate::report::format_optimize_result(&result));
        let min_val = objective.evaluate(p0)?;
        eprintln!("  min_val: {min_val}");
    }

    Ok(CurveFit {
        params: result.x.clone(),
        hess_inv: result.hess_inv.to_dense(),
        optimizer: result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelKind;
    use crate::models::predict;
    use approx::assert_abs_diff_eq;
    use std::cell::Cell;

    /// `f(x; a, b) = (a x, b x)`, interleaved.
    fn two_slopes(x: &[f64], p: &[f64]) -> Vec<f64> {
        x.iter().flat_map(|&xi| [p[0] * xi, p[1] * xi]).collect()
    }

    fn quiet(norm: Norm) -> FitOptions {
        FitOptions {
            norm,
            verbose: false,
            ..FitOptions::default()
        }
    }

    #[test]
    fn recovers_two_slopes_with_l2() {
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 3.0, 4.0, 6.0, 6.0, 9.0];
        let fit = curve_fit(&two_slopes, &x[..], &y, &[1.0, 1.0], &quiet(Norm::L2)).unwrap();
        assert_abs_diff_eq!(fit.params[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.params[1], 3.0, epsilon = 1e-6);
        assert_eq!(fit.hess_inv.shape(), (2, 2));
        assert!(!fit.optimizer.hess_inv.is_empty());
    }

    #[test]
    fn hess_inv_approximates_inverse_hessian_of_smooth_objective() {
        // Channel 0 is a + b x, channel 1 is a x. With a mean-square norm the
        // objective is quadratic with Hessian [[17, 5], [5, 15]] on x = 1..4.
        fn mean_square(r: &[f64]) -> f64 {
            r.iter().map(|v| v * v).sum::<f64>() / r.len() as f64
        }
        let model = |x: &[f64], p: &[f64]| -> Vec<f64> {
            x.iter().flat_map(|&xi| [p[0] + p[1] * xi, p[0] * xi]).collect()
        };
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = model(&x[..], &[1.0, 2.0]);

        let fit = curve_fit(&model, &x[..], &y, &[5.0, -3.0], &quiet(Norm::Custom(mean_square))).unwrap();
        assert_abs_diff_eq!(fit.params[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.params[1], 2.0, epsilon = 1e-6);
        assert!(!fit.optimizer.hess_inv.is_empty());

        let exact = DMatrix::from_row_slice(2, 2, &[17.0, 5.0, 5.0, 15.0]).try_inverse().unwrap();
        assert!(fit.hess_inv != DMatrix::identity(2, 2));
        for i in 0..2 {
            for j in 0..2 {
                assert_abs_diff_eq!(fit.hess_inv[(i, j)], exact[(i, j)], epsilon = 0.05 * exact[(0, 0)]);
            }
        }
    }

    #[test]
    fn recovers_two_slopes_with_l1() {
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 3.0, 4.0, 6.0, 6.0, 9.0];
        let fit = curve_fit(&two_slopes, &x[..], &y, &[-5.0, 10.0], &quiet(Norm::L1)).unwrap();
        assert_abs_diff_eq!(fit.params[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.params[1], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn recovers_exponential_growth_for_both_norms() {
        let x: Vec<f64> = (0..21).map(f64::from).collect();
        let y = predict(ModelKind::Exponential, &x, &[10.0, 3.5]);
        for norm in [Norm::L1, Norm::L2] {
            let fit = curve_fit(&ModelKind::Exponential, x.as_slice(), &y, &[8.0, 3.0], &quiet(norm)).unwrap();
            assert_abs_diff_eq!(fit.params[0], 10.0, epsilon = 1e-4);
            assert_abs_diff_eq!(fit.params[1], 3.5, epsilon = 1e-4);
        }
    }

    #[test]
    fn l1_fit_on_noisy_growth_reaches_a_low_objective() {
        // Deterministic multiplicative noise of about 5% on each channel.
        let x: Vec<f64> = (0..30).map(f64::from).collect();
        let mut y = predict(ModelKind::Exponential, &x, &[10.0, 3.5]);
        for i in 0..x.len() {
            let t = i as f64;
            y[2 * i] *= (0.05 * (1.7 * t + 0.3).sin()).exp();
            y[2 * i + 1] *= (0.05 * (2.3 * t + 1.1).cos()).exp();
        }
        let opts = quiet(Norm::L1);
        let objective =
            WeightedObjective::new(&ModelKind::Exponential, x.as_slice(), &y, opts.lagrange, opts.norm).unwrap();
        let at_truth = objective.evaluate(&[10.0, 3.5]).unwrap();

        let fit = curve_fit(&ModelKind::Exponential, x.as_slice(), &y, &[8.0, 3.0], &opts).unwrap();
        assert!(
            fit.optimizer.fun <= 0.95 * at_truth,
            "objective {} vs {} at the generating parameters",
            fit.optimizer.fun,
            at_truth
        );
    }

    #[test]
    fn identical_inputs_give_identical_fits() {
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 3.0, 4.0, 6.0, 6.0, 9.0];
        let opts = quiet(Norm::L2);
        let a = curve_fit(&two_slopes, &x[..], &y, &[1.0, 1.0], &opts).unwrap();
        let b = curve_fit(&two_slopes, &x[..], &y, &[1.0, 1.0], &opts).unwrap();
        assert_eq!(a.params, b.params);
        assert_eq!(a.hess_inv, b.hess_inv);
        assert_eq!(a.optimizer.nfev, b.optimizer.nfev);
    }

    #[test]
    fn fitted_parameters_stay_inside_bounds() {
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 3.0, 4.0, 6.0, 6.0, 9.0];
        let bounds = vec![Bound::new(0.0, 1.5), Bound::new(0.0, 2.5)];
        let opts = FitOptions {
            bounds: Some(bounds.clone()),
            ..quiet(Norm::L2)
        };
        let fit = curve_fit(&two_slopes, &x[..], &y, &[1.0, 1.0], &opts).unwrap();
        for (p, b) in fit.params.iter().zip(&bounds) {
            assert!(b.contains(*p), "{p} outside {b:?}");
        }
        assert_abs_diff_eq!(fit.params[0], 1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.params[1], 2.5, epsilon = 1e-9);
    }

    #[test]
    fn larger_lagrange_never_worsens_second_channel() {
        // One shared level `a` pulled towards 0 by channel 0 and towards 1 by channel 1.
        // With a squared norm the optimum is a = lagrange / (1 + lagrange).
        fn mean_square(r: &[f64]) -> f64 {
            r.iter().map(|v| v * v).sum::<f64>() / r.len() as f64
        }
        let level = |x: &[f64], p: &[f64]| -> Vec<f64> { x.iter().flat_map(|_| [p[0], p[0]]).collect() };
        let x = [0.0; 4];
        let y = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let mut previous = f64::INFINITY;
        for lagrange in [0.5, 1.0, 2.0, 10.0] {
            let opts = FitOptions {
                lagrange,
                ..quiet(Norm::Custom(mean_square))
            };
            let fit = curve_fit(&level, &x[..], &y, &[0.3], &opts).unwrap();
            assert_abs_diff_eq!(fit.params[0], lagrange / (1.0 + lagrange), epsilon = 1e-6);

            let objective = WeightedObjective::new(&level, &x[..], &y, lagrange, opts.norm).unwrap();
            let [_, second] = objective.channel_norms(&fit.params).unwrap();
            assert!(second <= previous + 1e-12);
            previous = second;
        }
    }

    #[test]
    fn odd_length_data_is_rejected_before_any_evaluation() {
        let calls = Cell::new(0usize);
        let counting = |x: &[f64], p: &[f64]| -> Vec<f64> {
            calls.set(calls.get() + 1);
            two_slopes(x, p)
        };
        let err = curve_fit(&counting, &[1.0, 2.0][..], &[1.0, 2.0, 3.0], &[1.0, 1.0], &quiet(Norm::L2)).unwrap_err();
        assert_eq!(err, FitError::ShapeMismatch { len: 3, channels: 2 });
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn wrongly_sized_model_output_propagates() {
        let short = |_: &[f64], p: &[f64]| -> Vec<f64> { vec![p[0], p[1]] };
        let err = curve_fit(&short, &[1.0, 2.0][..], &[1.0, 2.0, 3.0, 4.0], &[1.0, 1.0], &quiet(Norm::L2)).unwrap_err();
        assert_eq!(err, FitError::LengthMismatch { expected: 4, actual: 2 });
    }

    #[test]
    fn invalid_options_are_rejected() {
        let x = [1.0, 2.0];
        let y = [1.0, 1.0, 2.0, 2.0];
        let negative = FitOptions {
            lagrange: -1.0,
            ..quiet(Norm::L2)
        };
        assert!(matches!(
            curve_fit(&two_slopes, &x[..], &y, &[1.0, 1.0], &negative),
            Err(FitError::InvalidInput(_))
        ));
        let bad_tol = FitOptions {
            tol: -1e-3,
            ..quiet(Norm::L2)
        };
        assert!(matches!(
            curve_fit(&two_slopes, &x[..], &y, &[1.0, 1.0], &bad_tol),
            Err(FitError::InvalidInput(_))
        ));
        let wrong_bounds = FitOptions {
            bounds: Some(vec![Bound::free()]),
            ..quiet(Norm::L2)
        };
        assert!(matches!(
            curve_fit(&two_slopes, &x[..], &y, &[1.0, 1.0], &wrong_bounds),
            Err(FitError::InvalidInput(_))
        ));
    }

    #[test]
    fn fit_tolerance_overrides_the_minimizer_tolerance() {
        let x = [1.0, 2.0, 3.0];
        let y = [2.0, 3.0, 4.0, 6.0, 6.0, 9.0];
        let loose = Lbfgsb::default().with_tolerance(1e-1);
        let opts = quiet(Norm::L2);

        let via_default = curve_fit(&two_slopes, &x[..], &y, &[1.0, 1.0], &opts).unwrap();
        let via_loose = curve_fit_with(&loose, &two_slopes, &x[..], &y, &[1.0, 1.0], &opts).unwrap();
        assert_eq!(via_default.params, via_loose.params);
        assert_eq!(via_default.optimizer.nfev, via_loose.optimizer.nfev);

        let bad_tol = FitOptions {
            tol: f64::NAN,
            ..quiet(Norm::L2)
        };
        assert!(matches!(
            curve_fit_with(&loose, &two_slopes, &x[..], &y, &[1.0, 1.0], &bad_tol),
            Err(FitError::InvalidInput(_))
        ));
    }

    #[test]
    fn split_channels_requires_even_length() {
        let [a, b] = split_channels(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(a, vec![1.0, 3.0]);
        assert_eq!(b, vec![2.0, 4.0]);
        assert!(split_channels(&[1.0]).is_err());
    }
}
