//! Activation Functions
//!
//! This module provides ReLU and leaky ReLU with explicit backward passes.
//!
//! ## ReLU (Rectified Linear Unit)
//!
//! ```text
//! relu(x) = max(x, 0)
//! ```
//!
//! The gradient is 1 where the input was positive and 0 elsewhere. The
//! mask is defined on the *input* sign, not the output value, which is why
//! the cache stores the pre-activation input.
//!
//! ## Leaky ReLU
//!
//! ```text
//! lrelu(x) = max(slope * x, x)    for slope in (0, 1)
//! ```
//!
//! Identity for x ≥ 0 and slope * x for x < 0. Unlike plain ReLU, a small
//! gradient still flows through negative inputs, which keeps units from
//! dying during training.
//!
//! ## Boundary Policy
//!
//! The two functions treat x == 0 differently, and each backward mask
//! matches its forward definition:
//!
//! - ReLU zeroes the gradient where the cached input was `<= 0`, so the
//!   boundary gets gradient 0.
//! - Leaky ReLU scales the gradient only where the cached input was `< 0`
//!   (strict), so the boundary gets the positive-branch gradient 1.

use ndarray::{Array2, Zip};

/// Negative-side slope used for leaky ReLU unless the caller picks another.
pub const DEFAULT_NEGATIVE_SLOPE: f64 = 1e-3;

/// Cache for the ReLU backward pass: the pre-activation input.
pub struct ReluCache {
    pub x: Array2<f64>,
}

/// Cache for the leaky ReLU backward pass: the pre-activation input and
/// the slope the forward pass used.
pub struct LeakyReluCache {
    pub x: Array2<f64>,
    pub slope: f64,
}

/// ReLU forward pass
///
/// Computes max(x, 0) element-wise.
///
/// # Arguments
///
/// * `x` - Input batch [batch, features]
///
/// # Returns
///
/// Tuple of (output, cache). The cache stores the input itself, since
/// the backward mask is defined on the input sign.
pub fn relu_forward(x: &Array2<f64>) -> (Array2<f64>, ReluCache) {
    let out = x.mapv(|v| v.max(0.0));
    (out, ReluCache { x: x.clone() })
}

/// ReLU backward pass
///
/// Returns a copy of `grad_out` with positions zeroed wherever the cached
/// input was `<= 0`. The upstream gradient is never modified in place.
///
/// # Arguments
///
/// * `grad_out` - Gradient from the next layer [batch, features]
/// * `cache` - Cached input from the forward pass
pub fn relu_backward(grad_out: &Array2<f64>, cache: &ReluCache) -> Array2<f64> {
    let mut grad_x = grad_out.clone();
    Zip::from(&mut grad_x).and(&cache.x).for_each(|g, &x| {
        if x <= 0.0 {
            *g = 0.0;
        }
    });
    grad_x
}

/// Leaky ReLU forward pass
///
/// Computes max(slope * x, x) element-wise: identity for x ≥ 0 and
/// slope * x for x < 0.
///
/// # Arguments
///
/// * `x` - Input batch [batch, features]
/// * `slope` - Negative-side slope, must lie in (0, 1); see
///   [`DEFAULT_NEGATIVE_SLOPE`]
///
/// # Returns
///
/// Tuple of (output, cache). The cache stores the input and the slope.
///
/// # Panics
///
/// Panics if `slope` is outside (0, 1).
pub fn leaky_relu_forward(x: &Array2<f64>, slope: f64) -> (Array2<f64>, LeakyReluCache) {
    assert!(
        slope > 0.0 && slope < 1.0,
        "Leaky ReLU slope must lie in (0, 1), got {}",
        slope
    );
    let out = x.mapv(|v| (slope * v).max(v));
    (
        out,
        LeakyReluCache {
            x: x.clone(),
            slope,
        },
    )
}

/// Leaky ReLU backward pass
///
/// Returns a copy of `grad_out`, scaled by the cached slope wherever the
/// cached input was strictly negative and unchanged elsewhere. An input of
/// exactly 0 takes the positive-branch gradient.
///
/// # Arguments
///
/// * `grad_out` - Gradient from the next layer [batch, features]
/// * `cache` - Cached input and slope from the forward pass
pub fn leaky_relu_backward(grad_out: &Array2<f64>, cache: &LeakyReluCache) -> Array2<f64> {
    let mut grad_x = grad_out.clone();
    Zip::from(&mut grad_x).and(&cache.x).for_each(|g, &x| {
        if x < 0.0 {
            *g *= cache.slope;
        }
    });
    grad_x
}
