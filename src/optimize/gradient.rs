//! Box projection, finite-difference gradients and gradient sampling helpers.

use nalgebra::DVector;

use crate::domain::Bound;
use crate::error::FitError;

/// Clamp every component of `x` into its box.
pub fn project_into(x: &mut [f64], bounds: &[Bound]) {
    for (v, b) in x.iter_mut().zip(bounds) {
        *v = b.project(*v);
    }
}

/// Infinity norm of the projected gradient `P(x - g) - x`.
///
/// Zero exactly when `x` satisfies the first-order conditions of the
/// box-constrained problem.
pub fn projected_gradient_norm(x: &[f64], g: &[f64], bounds: &[Bound]) -> f64 {
    x.iter()
        .zip(g)
        .zip(bounds)
        .map(|((&xi, &gi), b)| (b.project(xi - gi) - xi).abs())
        .fold(0.0, f64::max)
}

/// Forward-difference gradient of `f` at `x` (where `f(x) = fx`).
///
/// Every evaluated point stays inside the box:
///
/// - the forward step is used when it fits, else the backward step
/// - a box narrower than `eps` is differenced across whatever room it has
/// - a fixed parameter (`lower == upper`) gets a zero component without
///   evaluating `f`
///
/// If the first side evaluates to a non-finite value the other side is tried
/// when it fits.
pub fn forward_difference<F>(
    f: &mut F,
    x: &[f64],
    fx: f64,
    eps: f64,
    bounds: &[Bound],
) -> Result<Vec<f64>, FitError>
where
    F: FnMut(&[f64]) -> Result<f64, FitError>,
{
    let mut shifted = x.to_vec();
    let mut grad = Vec::with_capacity(x.len());

    for i in 0..x.len() {
        let steps = difference_steps(x[i], eps, &bounds[i]);
        if steps.is_empty() {
            grad.push(0.0);
            continue;
        }

        let mut component = f64::NAN;
        for h in steps {
            shifted[i] = bounds[i].project(x[i] + h);
            let step = shifted[i] - x[i];
            if step == 0.0 {
                continue;
            }
            let f_shifted = f(&shifted)?;
            component = (f_shifted - fx) / step;
            if component.is_finite() {
                break;
            }
        }
        shifted[i] = x[i];

        if !component.is_finite() {
            return Err(FitError::NonFinite(format!(
                "gradient component {i} at parameters {x:?}"
            )));
        }
        grad.push(component);
    }

    Ok(grad)
}

/// Candidate difference steps for one coordinate, preferred side first.
fn difference_steps(xi: f64, eps: f64, bound: &Bound) -> Vec<f64> {
    let room_up = bound.upper_bound() - xi;
    let room_down = xi - bound.lower_bound();

    let mut steps = Vec::with_capacity(2);
    if eps <= room_up {
        steps.push(eps);
    }
    if eps <= room_down {
        steps.push(-eps);
    }
    if steps.is_empty() {
        let room = room_up.max(room_down);
        if room > 0.0 {
            steps.push(if room_up >= room_down { room } else { -room });
        }
    }
    steps
}

/// Point of minimum norm on the segment `[a, b]`.
fn min_norm_on_segment(a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
    let d = a - b;
    let dd = d.dot(&d);
    if !(dd > 0.0) {
        return a.clone();
    }
    let t = (d.dot(a) / dd).clamp(0.0, 1.0);
    a - d * t
}

/// Approximate minimum-norm element of the convex hull of `gradients`
/// (Frank-Wolfe iterations with exact segment minimization).
///
/// For gradients sampled on both sides of a kink this is the steepest
/// descent direction of the nonsmooth objective, up to sign. Returns an empty
/// vector for an empty input.
pub fn min_norm_combination(gradients: &[DVector<f64>]) -> DVector<f64> {
    let Some(first) = gradients.first() else {
        return DVector::zeros(0);
    };

    let mut v = first.clone();
    for _ in 0..200 {
        let Some(vertex) = gradients.iter().min_by(|a, b| a.dot(&v).total_cmp(&b.dot(&v))) else {
            break;
        };
        let vv = v.dot(&v);
        if vv - vertex.dot(&v) <= 1e-12 * vv {
            break;
        }
        v = min_norm_on_segment(&v, vertex);
    }
    v
}
