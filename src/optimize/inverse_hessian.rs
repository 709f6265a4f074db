//! Limited-memory inverse-Hessian estimate.
//!
//! L-BFGS never forms the inverse Hessian. It keeps the last `m` correction
//! pairs
//!
//! - `s_k = x_{k+1} - x_k`
//! - `y_k = g_{k+1} - g_k`
//!
//! and applies the implied operator with the two-loop recursion. The same pairs
//! are returned to the caller as `hess_inv`, which can be materialized as a
//! dense matrix for use as a rough covariance proxy.

use std::collections::VecDeque;

use nalgebra::{DMatrix, DVector};

/// Inverse-Hessian approximation represented by BFGS correction pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct InverseHessian {
    dim: usize,
    s: VecDeque<DVector<f64>>,
    y: VecDeque<DVector<f64>>,
}

impl InverseHessian {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            s: VecDeque::new(),
            y: VecDeque::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored correction pairs.
    pub fn len(&self) -> usize {
        self.s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    /// Store a pair, dropping the oldest once `memory` pairs are held.
    ///
    /// Callers are expected to have checked the curvature condition `s'y > 0`.
    pub fn push(&mut self, s: DVector<f64>, y: DVector<f64>, memory: usize) {
        if memory == 0 {
            return;
        }
        while self.s.len() >= memory {
            self.s.pop_front();
            self.y.pop_front();
        }
        self.s.push_back(s);
        self.y.push_back(y);
    }

    /// `H v` with `H0 = I`.
    pub fn apply(&self, v: &DVector<f64>) -> DVector<f64> {
        self.two_loop(v, 1.0)
    }

    /// `H v` with the scaled initial matrix `H0 = (s'y / y'y) I` of the newest
    /// pair. This is the operator used for search directions.
    pub fn scaled_apply(&self, v: &DVector<f64>) -> DVector<f64> {
        let gamma = match (self.s.back(), self.y.back()) {
            (Some(s), Some(y)) => {
                let yy = y.dot(y);
                if yy > 0.0 { s.dot(y) / yy } else { 1.0 }
            }
            _ => 1.0,
        };
        self.two_loop(v, gamma)
    }

    /// Dense `dim x dim` matrix.
    ///
    /// Built from `H0 = I` by the BFGS update
    /// `H <- (I - rho s y') H (I - rho y s') + rho s s'` for each stored pair,
    /// oldest first. Identity when no pairs are stored.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.dim;
        let identity = DMatrix::<f64>::identity(n, n);
        let mut h = identity.clone();
        for (s, y) in self.s.iter().zip(&self.y) {
            let rho = 1.0 / y.dot(s);
            let left = &identity - (s * y.transpose()) * rho;
            let right = &identity - (y * s.transpose()) * rho;
            h = &left * h * &right + (s * s.transpose()) * rho;
        }
        h
    }

    fn two_loop(&self, v: &DVector<f64>, gamma: f64) -> DVector<f64> {
        let m = self.s.len();
        let mut q = v.clone();
        let mut alpha = vec![0.0; m];
        let rho: Vec<f64> = self.s.iter().zip(&self.y).map(|(s, y)| 1.0 / y.dot(s)).collect();

        for i in (0..m).rev() {
            alpha[i] = rho[i] * self.s[i].dot(&q);
            q.axpy(-alpha[i], &self.y[i], 1.0);
        }

        let mut r = q * gamma;

        for i in 0..m {
            let beta = rho[i] * self.y[i].dot(&r);
            r.axpy(alpha[i] - beta, &self.s[i], 1.0);
        }

        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_pairs() -> InverseHessian {
        // A-conjugate pairs of the quadratic with Hessian A = diag(2, 8): y = A s.
        let mut h = InverseHessian::new(2);
        h.push(DVector::from_vec(vec![1.0, 0.5]), DVector::from_vec(vec![2.0, 4.0]), 10);
        h.push(DVector::from_vec(vec![-2.0, 1.0]), DVector::from_vec(vec![-4.0, 8.0]), 10);
        h
    }

    #[test]
    fn empty_memory_is_identity() {
        let h = InverseHessian::new(3);
        assert_eq!(h.to_dense(), DMatrix::identity(3, 3));
        let v = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(h.apply(&v), v);
    }

    #[test]
    fn dense_matrix_agrees_with_two_loop() {
        let h = sample_pairs();
        let dense = h.to_dense();
        let v = DVector::from_vec(vec![0.3, -1.7]);
        let via_matrix = &dense * &v;
        let via_pairs = h.apply(&v);
        for i in 0..2 {
            assert_relative_eq!(via_matrix[i], via_pairs[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn two_independent_pairs_recover_exact_inverse() {
        // Two conjugate secant pairs of a 2-D quadratic pin down A^-1.
        let dense = sample_pairs().to_dense();
        assert_relative_eq!(dense[(0, 0)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(dense[(1, 1)], 0.125, epsilon = 1e-12);
        assert_relative_eq!(dense[(0, 1)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(dense[(1, 0)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn memory_limit_drops_oldest_pair() {
        let mut h = sample_pairs();
        h.push(DVector::from_vec(vec![1.0, 1.0]), DVector::from_vec(vec![2.0, 8.0]), 2);
        assert_eq!(h.len(), 2);
        assert_eq!(h.dim(), 2);

        let mut newest = InverseHessian::new(2);
        newest.push(DVector::from_vec(vec![-2.0, 1.0]), DVector::from_vec(vec![-4.0, 8.0]), 2);
        newest.push(DVector::from_vec(vec![1.0, 1.0]), DVector::from_vec(vec![2.0, 8.0]), 2);
        assert_eq!(h, newest);
    }
}
