//! Bound-constrained minimization.
//!
//! The curve fitter only needs one thing from an optimizer: minimize a scalar
//! function of a parameter vector inside a box, and hand back the solution plus
//! a curvature estimate. That contract is the `BoundedMinimizer` trait; `Lbfgsb`
//! is the implementation the fitter uses by default.
//!
//! Result fields and termination messages follow the L-BFGS-B conventions
//! (`x`, `fun`, `jac`, `nit`, `nfev`, `njev`, `hess_inv`) so reports read the
//! same as the classic Fortran/SciPy output.

pub mod gradient;
pub mod inverse_hessian;
pub mod lbfgsb;

pub use gradient::*;
pub use inverse_hessian::*;
pub use lbfgsb::*;

use crate::domain::Bound;
use crate::error::FitError;

/// Minimizer of a scalar objective subject to per-parameter box constraints.
pub trait BoundedMinimizer {
    /// Minimize `f` starting from `x0`.
    ///
    /// `bounds` is either empty (unconstrained) or has one entry per parameter.
    /// Errors returned by `f` abort the search and propagate unchanged.
    fn minimize<F>(&self, f: F, x0: &[f64], bounds: &[Bound]) -> Result<OptimizeResult, FitError>
    where
        F: FnMut(&[f64]) -> Result<f64, FitError>;

    /// Copy of this minimizer whose convergence tests use `tol`.
    fn with_tolerance(&self, tol: f64) -> Self;
}

/// Which tolerance test ended a converged run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceReason {
    /// Infinity norm of the projected gradient fell to `gtol`.
    ProjectedGradient,
    /// Relative reduction of the objective fell to `ftol`.
    RelativeReduction,
}

/// Why the minimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationStatus {
    Converged(ConvergenceReason),
    MaxIterations,
    MaxEvaluations,
    /// Neither steepest descent nor sampled-gradient directions decreased the
    /// objective.
    LineSearchFailed,
}

impl TerminationStatus {
    /// Numeric status: `0` converged, `1` limit reached, `2` abnormal stop.
    pub fn code(&self) -> i32 {
        match self {
            TerminationStatus::Converged(_) => 0,
            TerminationStatus::MaxIterations | TerminationStatus::MaxEvaluations => 1,
            TerminationStatus::LineSearchFailed => 2,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, TerminationStatus::Converged(_))
    }

    pub fn message(&self) -> &'static str {
        match self {
            TerminationStatus::Converged(ConvergenceReason::ProjectedGradient) => {
                "CONVERGENCE: NORM_OF_PROJECTED_GRADIENT_<=_PGTOL"
            }
            TerminationStatus::Converged(ConvergenceReason::RelativeReduction) => {
                "CONVERGENCE: REL_REDUCTION_OF_F_<=_FACTR*EPSMCH"
            }
            TerminationStatus::MaxIterations => "STOP: TOTAL NO. of ITERATIONS REACHED LIMIT",
            TerminationStatus::MaxEvaluations => "STOP: TOTAL NO. of f AND g EVALUATIONS EXCEEDS LIMIT",
            TerminationStatus::LineSearchFailed => "ABNORMAL_TERMINATION_IN_LNSRCH",
        }
    }
}

/// Outcome of a minimization run.
///
/// Returned for every run that was able to start, converged or not; callers
/// inspect `status` to decide what to do with a non-converged result.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeResult {
    /// Final parameter vector.
    pub x: Vec<f64>,
    /// Objective value at `x`.
    pub fun: f64,
    /// Finite-difference gradient at `x`.
    pub jac: Vec<f64>,
    /// Completed iterations.
    pub nit: usize,
    /// Objective evaluations, including those spent on gradients.
    pub nfev: usize,
    /// Gradient evaluations.
    pub njev: usize,
    pub status: TerminationStatus,
    /// Limited-memory inverse-Hessian estimate at `x`.
    pub hess_inv: InverseHessian,
}

impl OptimizeResult {
    pub fn success(&self) -> bool {
        self.status.is_converged()
    }

    pub fn message(&self) -> &'static str {
        self.status.message()
    }
}
