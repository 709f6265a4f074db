//! Small linear least-squares helpers.
//!
//! The nonlinear fitter needs a starting point. For the built-in growth models a
//! good one falls out of a linearized problem:
//!
//! ```text
//! log N(x) = log n0 + (ln 2 / T) x          (doubling-time exponential)
//! log N(x) = log c  + k log x               (power law)
//! ```
//!
//! so we only ever solve tiny (2-column) systems here. SVD keeps the solve
//! well-behaved when the design matrix is tall or nearly rank deficient.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `y = intercept + slope * x`. Returns `(intercept, slope)`.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { x[i] });
    let rhs = DVector::from_iterator(n, y.iter().take(n).copied());
    let beta = solve_least_squares(&design, &rhs)?;
    Some((beta[0], beta[1]))
}

/// Fit `y = slope * x` (no intercept).
pub fn fit_through_origin(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n == 0 {
        return None;
    }
    let design = DMatrix::from_fn(n, 1, |i, _| x[i]);
    let rhs = DVector::from_iterator(n, y.iter().take(n).copied());
    let beta = solve_least_squares(&design, &rhs)?;
    Some(beta[0])
}
