//! Gradient Utilities
//!
//! This module provides utilities for working with the gradients the layer
//! backward passes produce: norm computation, clipping, and numerical
//! gradient checking.
//!
//! ## Components
//!
//! - **Gradient Norm Computation**: Measure the magnitude of gradients
//! - **Gradient Clipping**: Prevent gradient explosion by scaling
//! - **Numeric Gradient Checking**: Validate analytic backward passes
//!   against central finite differences
//!
//! ## Why Gradient Clipping?
//!
//! During training, occasional batches can produce very large gradients
//! that destabilize the model. Clipping prevents this by scaling down
//! gradients when their norm exceeds a threshold:
//!
//! ```text
//! norm = √(Σ gradient²)
//! if norm > max_norm:
//!     gradients *= (max_norm / norm)
//! ```
//!
//! All gradients are scaled by the same factor, preserving their relative
//! magnitudes while limiting the total update magnitude.
//!
//! ## Why Gradient Checking?
//!
//! A backward pass derived by hand is easy to get subtly wrong. The
//! central-difference approximation
//!
//! ```text
//! df/dx[i] ≈ (f(x + h·e_i) - f(x - h·e_i)) / 2h
//! ```
//!
//! only needs the forward pass, so comparing it against the analytic
//! gradient catches sign errors, dropped terms, and wrong axis reductions.
//!
//! ## Example
//!
//! ```rust
//! use handgrad::gradients::{grad_norm, numeric_gradient};
//! use ndarray::array;
//!
//! let grad_w = array![[3.0, 0.0]];
//! let grad_b = array![4.0];
//! let norm = grad_norm(&[grad_w.view().into_dyn(), grad_b.view().into_dyn()]);
//! assert_eq!(norm, 5.0);
//!
//! // Check the gradient of f(x) = Σ x² (analytically 2x)
//! let x = array![[1.0, -2.0]];
//! let grad = numeric_gradient(|x| x.mapv(|v| v * v).sum(), &x, 1e-5);
//! assert!((grad[[0, 0]] - 2.0).abs() < 1e-8);
//! ```

use ndarray::{Array, ArrayViewD, ArrayViewMutD, Dimension, NdIndex};

/// Compute the L2 norm over a collection of gradient arrays
///
/// The norm is the square root of the sum of all squared gradient values
/// across every array in the collection, giving a single number for the
/// overall magnitude of an update.
///
/// # Arguments
///
/// * `grads` - Gradient views, mixed ranks welcome (use `into_dyn`)
///
/// # Returns
///
/// The L2 norm: √(Σ g²) over all gradient values g
pub fn grad_norm(grads: &[ArrayViewD<'_, f64>]) -> f64 {
    let sum_sq: f64 = grads
        .iter()
        .map(|g| g.iter().map(|&v| v * v).sum::<f64>())
        .sum();
    sum_sq.sqrt()
}

/// Clip gradients to a maximum norm
///
/// When the joint norm of the collection exceeds `max_norm`, every value
/// is scaled proportionally to bring the norm down to exactly `max_norm`.
/// Gradients below the threshold are left untouched.
///
/// # Arguments
///
/// * `grads` - Mutable gradient views, scaled in place
/// * `max_norm` - Maximum allowed gradient norm (typically 1.0)
///
/// # Example
///
/// ```rust
/// use handgrad::gradients::clip_gradients;
/// use ndarray::array;
///
/// let mut g = array![[3.0, 4.0]];
/// clip_gradients(&mut [g.view_mut().into_dyn()], 1.0);
/// assert!((g[[0, 0]] - 0.6).abs() < 1e-12);
/// assert!((g[[0, 1]] - 0.8).abs() < 1e-12);
/// ```
pub fn clip_gradients(grads: &mut [ArrayViewMutD<'_, f64>], max_norm: f64) {
    let sum_sq: f64 = grads
        .iter()
        .map(|g| g.iter().map(|&v| v * v).sum::<f64>())
        .sum();
    let norm = sum_sq.sqrt();

    // Only scale if the norm exceeds the threshold
    if norm > max_norm {
        let scale = max_norm / norm;
        for g in grads.iter_mut() {
            g.mapv_inplace(|v| v * scale);
        }
    }
}

/// Approximate the gradient of a scalar function by central differences
///
/// Perturbs one element of `x` at a time by ±`step` and evaluates `f` at
/// both points:
///
/// ```text
/// grad[i] = (f(x + step·e_i) - f(x - step·e_i)) / (2·step)
/// ```
///
/// Works for any array rank; a step around 1e-5 balances truncation
/// against round-off for inputs of order 1.
///
/// # Arguments
///
/// * `f` - Scalar function of the whole array
/// * `x` - Point to differentiate at
/// * `step` - Perturbation size h
///
/// # Returns
///
/// Array of the same shape as `x` holding the approximate gradient
pub fn numeric_gradient<D, F>(mut f: F, x: &Array<f64, D>, step: f64) -> Array<f64, D>
where
    D: Dimension,
    D::Pattern: NdIndex<D> + Clone,
    F: FnMut(&Array<f64, D>) -> f64,
{
    let mut grad = Array::zeros(x.raw_dim());
    let mut probe = x.clone();

    for idx in ndarray::indices(x.raw_dim()) {
        let original = probe[idx.clone()];

        probe[idx.clone()] = original + step;
        let plus = f(&probe);

        probe[idx.clone()] = original - step;
        let minus = f(&probe);

        probe[idx.clone()] = original;
        grad[idx] = (plus - minus) / (2.0 * step);
    }

    grad
}

/// Maximum element-wise relative error between two gradient arrays
///
/// For each pair of values the error is |a - b| / max(|a| + |b|, 1e-12),
/// so positions where both gradients vanish contribute zero rather than
/// dividing by zero.
///
/// # Panics
///
/// Panics if the shapes differ.
pub fn max_relative_error<D: Dimension>(a: &Array<f64, D>, b: &Array<f64, D>) -> f64 {
    assert_eq!(
        a.shape(),
        b.shape(),
        "Gradient shapes don't match: {:?} vs {:?}",
        a.shape(),
        b.shape()
    );
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - y).abs() / (x.abs() + y.abs()).max(1e-12))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_grad_norm_known_value() {
        let a = array![[1.0, 2.0], [2.0, 0.0]];
        let b = array![4.0];

        // 1 + 4 + 4 + 0 + 16 = 25
        let norm = grad_norm(&[a.view().into_dyn(), b.view().into_dyn()]);
        assert_abs_diff_eq!(norm, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_clip_scales_down_to_max_norm() {
        let mut a = array![[3.0, 4.0]];
        clip_gradients(&mut [a.view_mut().into_dyn()], 2.5);

        // Norm was 5, so everything halves
        assert_abs_diff_eq!(a[[0, 0]], 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(a[[0, 1]], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            grad_norm(&[a.view().into_dyn()]),
            2.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_clip_leaves_small_gradients_alone() {
        let mut a = array![[0.3, 0.4]];
        let before = a.clone();
        clip_gradients(&mut [a.view_mut().into_dyn()], 1.0);

        assert_eq!(a, before);
    }

    #[test]
    fn test_numeric_gradient_of_quadratic() {
        let x = array![[1.0, -2.0], [0.5, 3.0]];
        let grad = numeric_gradient(|x| x.mapv(|v| v * v).sum(), &x, 1e-5);

        // d/dx Σ x² = 2x
        for (got, want) in grad.iter().zip(x.iter()) {
            assert_abs_diff_eq!(got, &(2.0 * want), epsilon = 1e-8);
        }
    }

    #[test]
    fn test_max_relative_error() {
        let a = array![1.0, 0.0, 2.0];
        let b = array![1.0, 0.0, 2.0];
        assert_eq!(max_relative_error(&a, &b), 0.0);

        let c = array![1.0, 0.0, 2.2];
        // |2.0 - 2.2| / (2.0 + 2.2)
        assert_abs_diff_eq!(
            max_relative_error(&a, &c),
            0.2 / 4.2,
            epsilon = 1e-12
        );
    }
}
