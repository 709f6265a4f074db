//! Projected limited-memory BFGS with box constraints.
//!
//! Each iteration:
//!
//! 1. stop if the projected gradient is within `gtol`
//! 2. freeze variables sitting on a bound whose gradient points out of the box
//! 3. build a quasi-Newton direction for the free variables (two-loop
//!    recursion); fall back to steepest descent after a restart or when the
//!    direction does not descend
//! 4. backtrack along the projected path `P(x + alpha d)` until the Armijo
//!    condition holds
//! 5. store the new `(s, y)` pair when it has positive curvature and the step
//!    is well above the finite-difference resolution
//!
//! A failed quasi-Newton search restarts from steepest descent but keeps the
//! stored pairs, so `hess_inv` always reflects the whole run. When steepest
//! descent itself finds no decrease (typically on a kink of an L1 objective)
//! gradients sampled around `x` are combined into the minimum-norm element of
//! their hull, and that direction is searched before giving up.
//!
//! Gradients are finite differences taken inside the box, so the objective only
//! has to be evaluable, not differentiable. Defaults mirror the classic
//! L-BFGS-B driver (`m = 10`, `eps = 1e-8`, `maxiter = maxfun = 15000`).

use std::cell::Cell;

use nalgebra::DVector;

use crate::domain::Bound;
use crate::error::FitError;
use crate::optimize::gradient::{forward_difference, min_norm_combination, project_into, projected_gradient_norm};
use crate::optimize::inverse_hessian::InverseHessian;
use crate::optimize::{BoundedMinimizer, ConvergenceReason, OptimizeResult, TerminationStatus};

/// Sufficient-decrease constant of the Armijo condition.
const ARMIJO_C1: f64 = 1e-4;

/// Step shrink factor per backtracking trial.
const BACKTRACK_FACTOR: f64 = 0.5;

/// A correction pair is stored only when its step exceeds this many
/// finite-difference steps (relative to `max(1, |x|_inf)`).
const MIN_PAIR_STEP: f64 = 1e3;

/// Sampling radii, relative to `max(1, |x|_inf)`, tried when steepest descent
/// stalls.
const SAMPLING_RADII: [f64; 3] = [1e-2, 1e-4, 1e-6];

/// Options for `Lbfgsb`.
#[derive(Debug, Clone)]
pub struct LbfgsbOptions {
    /// Number of correction pairs kept.
    pub memory: usize,
    /// Relative-reduction tolerance on the objective.
    pub ftol: f64,
    /// Tolerance on the infinity norm of the projected gradient.
    pub gtol: f64,
    /// Finite-difference step.
    pub eps: f64,
    pub max_iter: usize,
    /// Limit on objective evaluations (gradient evaluations included).
    pub max_fun: usize,
    /// Backtracking trials per line search.
    pub max_backtracks: usize,
}

impl Default for LbfgsbOptions {
    fn default() -> Self {
        Self {
            memory: 10,
            ftol: 2.220446049250313e-9,
            gtol: 1e-5,
            eps: 1e-8,
            max_iter: 15_000,
            max_fun: 15_000,
            max_backtracks: 40,
        }
    }
}

/// Bound-constrained L-BFGS minimizer.
#[derive(Debug, Clone, Default)]
pub struct Lbfgsb {
    pub options: LbfgsbOptions,
}

impl Lbfgsb {
    pub fn new(options: LbfgsbOptions) -> Self {
        Self { options }
    }

    fn validate(&self, x0: &[f64], bounds: &[Bound]) -> Result<Vec<Bound>, FitError> {
        let opts = &self.options;
        let n = x0.len();
        if n == 0 {
            return Err(FitError::InvalidInput("initial guess is empty".to_string()));
        }
        if x0.iter().any(|v| !v.is_finite()) {
            return Err(FitError::InvalidInput(format!("initial guess is not finite: {x0:?}")));
        }
        if opts.memory == 0 {
            return Err(FitError::InvalidInput("L-BFGS memory must be > 0".to_string()));
        }
        if !(opts.eps.is_finite() && opts.eps > 0.0) {
            return Err(FitError::InvalidInput(format!(
                "finite-difference step must be > 0, got {}",
                opts.eps
            )));
        }
        if !(opts.ftol >= 0.0 && opts.gtol >= 0.0) {
            return Err(FitError::InvalidInput(format!(
                "tolerances must be >= 0 (ftol={}, gtol={})",
                opts.ftol, opts.gtol
            )));
        }

        let bounds = if bounds.is_empty() {
            vec![Bound::free(); n]
        } else if bounds.len() != n {
            return Err(FitError::InvalidInput(format!(
                "expected {n} bounds (one per parameter), got {}",
                bounds.len()
            )));
        } else {
            bounds.to_vec()
        };

        for (i, b) in bounds.iter().enumerate() {
            if b.lower_bound().is_nan() || b.upper_bound().is_nan() || b.lower_bound() > b.upper_bound() {
                return Err(FitError::InvalidInput(format!(
                    "bound {i} is empty: lower={:?}, upper={:?}",
                    b.lower, b.upper
                )));
            }
        }

        Ok(bounds)
    }

    /// Projected backtracking search along `d` starting at step `alpha`.
    ///
    /// Returns the accepted point and its value, or `None` when no trial step
    /// satisfies the Armijo condition.
    #[allow(clippy::too_many_arguments)]
    fn line_search<F>(
        &self,
        f: &mut F,
        x: &DVector<f64>,
        fx: f64,
        g: &DVector<f64>,
        d: &DVector<f64>,
        mut alpha: f64,
        bounds: &[Bound],
    ) -> Result<Option<(DVector<f64>, f64)>, FitError>
    where
        F: FnMut(&[f64]) -> Result<f64, FitError>,
    {
        for _ in 0..self.options.max_backtracks {
            let trial = DVector::from_fn(x.len(), |i, _| bounds[i].project(x[i] + alpha * d[i]));
            let slope = g.dot(&(&trial - x));
            // Projection can remove the whole descent component of the step.
            if !(slope < 0.0) {
                return Ok(None);
            }

            let f_trial = f(trial.as_slice())?;
            if f_trial.is_finite() && f_trial <= fx + ARMIJO_C1 * slope {
                return Ok(Some((trial, f_trial)));
            }

            alpha *= BACKTRACK_FACTOR;
        }

        Ok(None)
    }

    /// Descent step from gradients sampled around `x`.
    ///
    /// For each radius, gradients are taken at points shifted along `-g` and
    /// along every free coordinate axis. The gradient at `x` itself is left out:
    /// on a kink its one-sided differences mix both sides. The negated
    /// minimum-norm element of the sampled gradients' hull is then searched
    /// with the same backtracking rule. Returns `None` when no radius yields a
    /// decrease.
    fn sampled_step<F>(
        &self,
        f: &mut F,
        x: &DVector<f64>,
        fx: f64,
        g_free: &DVector<f64>,
        free: &[bool],
        bounds: &[Bound],
    ) -> Result<Option<(DVector<f64>, f64)>, FitError>
    where
        F: FnMut(&[f64]) -> Result<f64, FitError>,
    {
        let n = x.len();
        let g_norm = g_free.norm();
        if !(g_norm > 0.0) {
            return Ok(None);
        }
        let scale = x.amax().max(1.0);

        let mut directions = vec![-g_free / g_norm];
        for i in (0..n).filter(|&i| free[i]) {
            for sign in [1.0, -1.0] {
                let mut e = DVector::zeros(n);
                e[i] = sign;
                directions.push(e);
            }
        }

        for radius in SAMPLING_RADII {
            let mut gradients = Vec::with_capacity(directions.len());
            for u in &directions {
                let mut point: Vec<f64> = (x + u * (radius * scale)).iter().copied().collect();
                project_into(&mut point, bounds);
                let f_point = f(&point)?;
                if !f_point.is_finite() {
                    continue;
                }
                let grad = match forward_difference(f, &point, f_point, self.options.eps, bounds) {
                    Ok(grad) => grad,
                    Err(FitError::NonFinite(_)) => continue,
                    Err(e) => return Err(e),
                };
                gradients.push(DVector::from_fn(n, |i, _| if free[i] { grad[i] } else { 0.0 }));
            }

            if gradients.is_empty() {
                continue;
            }
            let v = min_norm_combination(&gradients);
            let vv = v.dot(&v);
            if !(vv > 0.0) {
                continue;
            }

            let mut alpha = 1.0 / vv.sqrt();
            for _ in 0..self.options.max_backtracks {
                let trial = DVector::from_fn(n, |i, _| bounds[i].project(x[i] - alpha * v[i]));
                if &trial == x {
                    break;
                }
                let f_trial = f(trial.as_slice())?;
                if f_trial.is_finite() && f_trial <= fx - ARMIJO_C1 * alpha * vv {
                    return Ok(Some((trial, f_trial)));
                }
                alpha *= BACKTRACK_FACTOR;
            }
        }

        Ok(None)
    }
}

impl BoundedMinimizer for Lbfgsb {
    fn minimize<F>(&self, mut f: F, x0: &[f64], bounds: &[Bound]) -> Result<OptimizeResult, FitError>
    where
        F: FnMut(&[f64]) -> Result<f64, FitError>,
    {
        let bounds = self.validate(x0, bounds)?;
        let opts = &self.options;
        let n = x0.len();

        let nfev = Cell::new(0usize);
        let mut eval = |p: &[f64]| -> Result<f64, FitError> {
            nfev.set(nfev.get() + 1);
            f(p)
        };

        let mut start = x0.to_vec();
        project_into(&mut start, &bounds);
        let mut x = DVector::from_vec(start);
        let mut fx = eval(x.as_slice())?;
        if !fx.is_finite() {
            return Err(FitError::NonFinite(format!(
                "objective is {fx} at the initial point {:?}",
                x.as_slice()
            )));
        }

        let mut g = DVector::from_vec(forward_difference(&mut eval, x.as_slice(), fx, opts.eps, &bounds)?);
        let mut njev = 1;

        let mut memory = InverseHessian::new(n);
        let mut restart = true;
        let mut nit = 0;

        let status = loop {
            if projected_gradient_norm(x.as_slice(), g.as_slice(), &bounds) <= opts.gtol {
                break TerminationStatus::Converged(ConvergenceReason::ProjectedGradient);
            }
            if nit >= opts.max_iter {
                break TerminationStatus::MaxIterations;
            }

            let free: Vec<bool> = (0..n)
                .map(|i| {
                    let at_lower = x[i] <= bounds[i].lower_bound() && g[i] > 0.0;
                    let at_upper = x[i] >= bounds[i].upper_bound() && g[i] < 0.0;
                    !(at_lower || at_upper)
                })
                .collect();
            let g_free = DVector::from_fn(n, |i, _| if free[i] { g[i] } else { 0.0 });

            let mut steepest = restart || memory.is_empty();
            let mut d = DVector::zeros(n);
            if !steepest {
                let h_g = memory.scaled_apply(&g_free);
                d = DVector::from_fn(n, |i, _| if free[i] { -h_g[i] } else { 0.0 });
                steepest = !(g.dot(&d) < 0.0);
            }

            let alpha = if steepest {
                d = -&g_free;
                let d_norm = d.norm();
                if !(d_norm > 0.0) {
                    break TerminationStatus::Converged(ConvergenceReason::ProjectedGradient);
                }
                1.0 / d_norm
            } else {
                1.0
            };

            let accepted = match self.line_search(&mut eval, &x, fx, &g, &d, alpha, &bounds)? {
                Some(step) => Some(step),
                None if !steepest => {
                    restart = true;
                    continue;
                }
                None => {
                    let step = self.sampled_step(&mut eval, &x, fx, &g_free, &free, &bounds)?;
                    // A sampled step is not a steepest-descent step: a small
                    // reduction along it does not certify convergence.
                    steepest = false;
                    step
                }
            };
            let Some((x_new, f_new)) = accepted else {
                break TerminationStatus::LineSearchFailed;
            };
            nit += 1;
            restart = false;

            let g_new = DVector::from_vec(forward_difference(&mut eval, x_new.as_slice(), f_new, opts.eps, &bounds)?);
            njev += 1;

            let s = &x_new - &x;
            let y = &g_new - &g;
            let resolvable = s.amax() > MIN_PAIR_STEP * opts.eps * x_new.amax().max(1.0);
            if resolvable && s.dot(&y) > f64::EPSILON * y.dot(&y) {
                memory.push(s, y, opts.memory);
            }

            let rel_reduction = (fx - f_new) / fx.abs().max(f_new.abs()).max(1.0);
            x = x_new;
            fx = f_new;
            g = g_new;

            if rel_reduction <= opts.ftol {
                if steepest {
                    break TerminationStatus::Converged(ConvergenceReason::RelativeReduction);
                }
                // A stalled quasi-Newton step is not trusted for convergence.
                restart = true;
            }
            if nfev.get() >= opts.max_fun {
                break TerminationStatus::MaxEvaluations;
            }
        };

        Ok(OptimizeResult {
            x: x.iter().copied().collect(),
            fun: fx,
            jac: g.iter().copied().collect(),
            nit,
            nfev: nfev.get(),
            njev,
            status,
            hess_inv: memory,
        })
    }

    fn with_tolerance(&self, tol: f64) -> Self {
        Lbfgsb::new(LbfgsbOptions {
            ftol: tol,
            gtol: tol,
            ..self.options.clone()
        })
    }
}
