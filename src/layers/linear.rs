//! Linear Layer (Fully Connected)
//!
//! The linear layer is the fundamental building block of feed-forward
//! networks. It performs an affine transformation: y = x @ W + b
//!
//! ## Forward Pass
//!
//! ```text
//! Input:  x [batch, in_features]
//! Weight: W [in_features, out_features]
//! Bias:   b [out_features]
//! Output: y = x @ W + b [batch, out_features]
//! ```
//!
//! ## Backward Pass
//!
//! Using the chain rule:
//! ```text
//! grad_W = x^T @ grad_y
//! grad_b = sum(grad_y, axis=0)
//! grad_x = grad_y @ W^T
//! ```
//!
//! ## Why These Gradients?
//!
//! - **grad_W**: Each weight W[i,j] affects output y[*,j] through input x[*,i]
//! - **grad_b**: Each bias b[j] affects all outputs y[*,j] equally
//! - **grad_x**: Needed to backprop to the previous layer
//!
//! ## Implementation Notes
//!
//! - Uses He initialization: scale = √(2/in_features)
//! - Bias initialized to zero
//! - Caches the input x for the backward pass

use ndarray::{Array1, Array2, Axis};
use ndarray_rand::RandomExt;
use rand_distr::Normal;

/// Linear layer (fully connected)
///
/// Performs y = x @ W + b where:
/// - W: weight matrix [in_features, out_features]
/// - b: bias vector [out_features]
///
/// The layer owns its parameters; `forward` and `backward` take `&self`,
/// so a call never modifies them.
pub struct Linear {
    pub weight: Array2<f64>,
    pub bias: Array1<f64>,
}

impl Linear {
    /// Create a new linear layer with He initialization
    ///
    /// # Arguments
    ///
    /// * `in_features` - Input dimension
    /// * `out_features` - Output dimension
    ///
    /// # Initialization
    ///
    /// Weights are drawn from N(0, 2/in_features). This helps prevent
    /// vanishing/exploding activations in deep networks.
    pub fn new(in_features: usize, out_features: usize) -> Self {
        let std = (2.0 / in_features as f64).sqrt();
        let normal = Normal::new(0.0, std).unwrap();
        Self {
            weight: Array2::random((in_features, out_features), normal),
            bias: Array1::zeros(out_features),
        }
    }

    /// Create a linear layer from existing parameters
    ///
    /// # Panics
    ///
    /// Panics if the bias length doesn't match the weight's column count.
    pub fn from_parts(weight: Array2<f64>, bias: Array1<f64>) -> Self {
        assert_eq!(
            weight.ncols(),
            bias.len(),
            "Bias length ({}) doesn't match weight columns ({})",
            bias.len(),
            weight.ncols()
        );
        Self { weight, bias }
    }

    /// Forward pass
    ///
    /// Computes y = x @ W + b and caches x for the backward pass.
    ///
    /// # Arguments
    ///
    /// * `x` - Input batch [batch, in_features]
    ///
    /// # Returns
    ///
    /// Tuple of (output, cache) where:
    /// - output: [batch, out_features]
    /// - cache: stores x for the backward pass
    ///
    /// # Panics
    ///
    /// Panics if x's column count doesn't match the weight's row count.
    pub fn forward(&self, x: &Array2<f64>) -> (Array2<f64>, LinearCache) {
        assert_eq!(
            x.ncols(),
            self.weight.nrows(),
            "Input features ({}) don't match weight rows ({})",
            x.ncols(),
            self.weight.nrows()
        );
        let y = x.dot(&self.weight) + &self.bias;
        let cache = LinearCache { x: x.clone() };
        (y, cache)
    }

    /// Backward pass
    ///
    /// Computes gradients for the weights, bias, and input. Pure function
    /// of its arguments; the cache is valid for exactly one backward call
    /// and must be discarded once the parameters change.
    ///
    /// # Arguments
    ///
    /// * `grad_out` - Gradient from the next layer [batch, out_features]
    /// * `cache` - Cached values from the forward pass
    ///
    /// # Returns
    ///
    /// Gradients for weight, bias, and input
    pub fn backward(&self, grad_out: &Array2<f64>, cache: &LinearCache) -> LinearGradients {
        // grad_W = x^T @ grad_out
        let grad_weight = cache.x.t().dot(grad_out);

        // grad_b = sum(grad_out) over the batch axis
        let grad_bias = grad_out.sum_axis(Axis(0));

        // grad_x = grad_out @ W^T
        let grad_x = grad_out.dot(&self.weight.t());

        LinearGradients {
            weight: grad_weight,
            bias: grad_bias,
            x: grad_x,
        }
    }
}

/// Cache for the linear backward pass
pub struct LinearCache {
    pub x: Array2<f64>,
}

/// Gradients for the linear layer
pub struct LinearGradients {
    pub weight: Array2<f64>,
    pub bias: Array1<f64>,
    /// Gradient to pass to the previous layer
    pub x: Array2<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradients::{max_relative_error, numeric_gradient};
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::Uniform;

    #[test]
    fn test_forward_values() {
        let layer = Linear::from_parts(
            array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
            array![0.5, -0.5],
        );
        let x = array![[1.0, 2.0, 3.0]];
        let (y, cache) = layer.forward(&x);

        assert_eq!(y, array![[4.5, 4.5]]);
        assert_eq!(cache.x, x);
    }

    #[test]
    #[should_panic(expected = "Input features")]
    fn test_forward_shape_mismatch() {
        let layer = Linear::new(3, 2);
        let x = Array2::zeros((4, 5));
        layer.forward(&x);
    }

    #[test]
    fn test_backward_with_ones_upstream() {
        let mut rng = StdRng::seed_from_u64(7);
        let layer = Linear::from_parts(
            Array2::random_using((3, 2), Uniform::new(-1.0, 1.0), &mut rng),
            Array1::random_using(2, Uniform::new(-1.0, 1.0), &mut rng),
        );
        let x = Array2::random_using((5, 3), Uniform::new(-1.0, 1.0), &mut rng);

        let (_, cache) = layer.forward(&x);
        let ones = Array2::ones((5, 2));
        let grads = layer.backward(&ones, &cache);

        // grad_W = x^T @ ones
        let expected_weight = x.t().dot(&ones);
        for (got, want) in grads.weight.iter().zip(expected_weight.iter()) {
            assert_abs_diff_eq!(got, want, epsilon = 1e-12);
        }

        // grad_b = column sums of ones = batch size per entry
        assert_eq!(grads.bias, array![5.0, 5.0]);

        // grad_x = ones @ W^T
        let expected_x = ones.dot(&layer.weight.t());
        for (got, want) in grads.x.iter().zip(expected_x.iter()) {
            assert_abs_diff_eq!(got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gradient_check() {
        let mut rng = StdRng::seed_from_u64(13);
        let weight = Array2::random_using((4, 3), Uniform::new(-1.0, 1.0), &mut rng);
        let bias = Array1::random_using(3, Uniform::new(-1.0, 1.0), &mut rng);
        let x = Array2::random_using((6, 4), Uniform::new(-1.0, 1.0), &mut rng);
        // Fixed upstream direction, so the scalar loss is sum(out * r)
        let r = Array2::random_using((6, 3), Uniform::new(-1.0, 1.0), &mut rng);

        let layer = Linear::from_parts(weight.clone(), bias.clone());
        let (_, cache) = layer.forward(&x);
        let grads = layer.backward(&r, &cache);

        let numeric_x =
            numeric_gradient(|probe| (&layer.forward(probe).0 * &r).sum(), &x, 1e-5);
        assert!(max_relative_error(&grads.x, &numeric_x) < 1e-5);

        let numeric_weight = numeric_gradient(
            |probe| {
                let perturbed = Linear::from_parts(probe.clone(), bias.clone());
                (&perturbed.forward(&x).0 * &r).sum()
            },
            &weight,
            1e-5,
        );
        assert!(max_relative_error(&grads.weight, &numeric_weight) < 1e-5);

        let numeric_bias = numeric_gradient(
            |probe| {
                let perturbed = Linear::from_parts(weight.clone(), probe.clone());
                (&perturbed.forward(&x).0 * &r).sum()
            },
            &bias,
            1e-5,
        );
        assert!(max_relative_error(&grads.bias, &numeric_bias) < 1e-5);
    }
}
