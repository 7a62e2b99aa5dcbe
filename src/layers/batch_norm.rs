//! Batch Normalization
//!
//! Batch normalization standardizes each feature over the batch, then
//! applies a learnable scale (gamma) and shift (beta). Normalized inputs
//! keep activations in a well-conditioned range and allow higher learning
//! rates.
//!
//! ## The Tricky Part: Backward Pass
//!
//! The batch mean and variance depend on *every* sample in the batch, so a
//! change to one input moves the statistics for all of them. The backward
//! pass has to chain through three coupled quantities: the normalized
//! input, the variance, and the mean.
//!
//! ## Forward Pass (training)
//!
//! ```text
//! 1. mu = mean(x, axis=0)                    per feature
//! 2. var = mean((x - mu)², axis=0)           biased, per feature
//! 3. x_norm = (x - mu) / √(var + ε)
//! 4. y = γ * x_norm + β
//! 5. running = momentum * running + (1 - momentum) * batch
//! ```
//!
//! ## Forward Pass (inference)
//!
//! Same normalization, but using the running statistics accumulated during
//! training instead of batch statistics. No cache is produced and the
//! running statistics are left untouched.
//!
//! ## Backward Pass
//!
//! ```text
//! std_inv = 1 / √(var + ε)
//! dx_norm = dy * γ
//! dvar = -0.5 * sum(dx_norm * (x - mu)) * std_inv³
//! dmu  = -std_inv * sum(dx_norm) - 2 * dvar * sum(x - mu) / N
//! dx   = dx_norm * std_inv + dvar * 2 * (x - mu) / N + dmu / N
//! dgamma = sum(dy * x_norm)
//! dbeta  = sum(dy)
//! ```
//!
//! All sums run over the batch axis. The variance gradient must be
//! computed before the mean gradient: dmu folds in dvar's contribution
//! through the `2 * dvar * sum(x - mu) / N` cross-term, and dropping that
//! term produces wrong input gradients.
//!
//! Forward and backward share the same ε. Mixing two different stability
//! constants makes the backward pass inconsistent with the output the
//! forward pass actually produced.

use ndarray::{Array1, Array2, Axis};

/// Batch normalization layer
///
/// Owns the learnable scale and shift; the running statistics live outside
/// the layer as an explicit [`RunningStats`] value that training-mode
/// forward calls take and return. Keeping the statistics external makes
/// every method on this type a pure function of its arguments and leaves
/// their lifecycle to the training driver.
pub struct BatchNorm {
    /// Scale parameter, one per feature
    pub gamma: Array1<f64>,
    /// Shift parameter, one per feature
    pub beta: Array1<f64>,
    /// Numerical-stability constant shared by forward and backward
    pub eps: f64,
    /// Exponential-moving-average weight for the running statistics
    pub momentum: f64,
}

/// Exponentially-averaged per-feature statistics for inference
///
/// Updated on every training-mode forward call, consumed unchanged at
/// inference time. The value is passed in and a new one returned, never
/// mutated in place, so independent callers can't race on shared state.
#[derive(Clone, Debug, PartialEq)]
pub struct RunningStats {
    pub mean: Array1<f64>,
    pub var: Array1<f64>,
}

impl RunningStats {
    /// Fresh statistics: mean 0, variance 1 per feature
    pub fn new(num_features: usize) -> Self {
        Self {
            mean: Array1::zeros(num_features),
            var: Array1::ones(num_features),
        }
    }
}

impl BatchNorm {
    /// Create a new batch normalization layer
    ///
    /// # Arguments
    ///
    /// * `num_features` - Size of the feature dimension
    ///
    /// # Initialization
    ///
    /// - gamma initialized to 1.0 (no scaling initially)
    /// - beta initialized to 0.0 (no shift initially)
    /// - eps = 1e-7
    /// - momentum = 0.9
    pub fn new(num_features: usize) -> Self {
        Self {
            gamma: Array1::ones(num_features),
            beta: Array1::zeros(num_features),
            eps: 1e-7,
            momentum: 0.9,
        }
    }

    /// Training-mode forward pass
    ///
    /// Normalizes with statistics computed from this batch, then folds the
    /// batch statistics into the running statistics.
    ///
    /// # Arguments
    ///
    /// * `x` - Input batch [batch, features]
    /// * `stats` - Running statistics accumulated so far
    ///
    /// # Returns
    ///
    /// Tuple of (output, cache, updated statistics). The cache is valid
    /// for exactly one [`backward`](Self::backward) call; the updated
    /// statistics replace the ones passed in.
    ///
    /// # Panics
    ///
    /// Panics if x's feature count doesn't match the layer's.
    pub fn forward_train(
        &self,
        x: &Array2<f64>,
        stats: &RunningStats,
    ) -> (Array2<f64>, BatchNormCache, RunningStats) {
        assert_eq!(
            x.ncols(),
            self.gamma.len(),
            "Input features ({}) don't match layer features ({})",
            x.ncols(),
            self.gamma.len()
        );
        let n = x.nrows() as f64;

        // Per-feature batch statistics (biased variance, /N)
        let mean = x.sum_axis(Axis(0)) / n;
        let centered = x - &mean;
        let var = centered.mapv(|v| v * v).sum_axis(Axis(0)) / n;

        // Normalize, then scale and shift
        let std = var.mapv(|v| (v + self.eps).sqrt());
        let x_norm = &centered / &std;
        let out = &x_norm * &self.gamma + &self.beta;

        let updated = RunningStats {
            mean: &stats.mean * self.momentum + &mean * (1.0 - self.momentum),
            var: &stats.var * self.momentum + &var * (1.0 - self.momentum),
        };

        let cache = BatchNormCache {
            x: x.clone(),
            x_norm,
            mean,
            var,
        };

        (out, cache, updated)
    }

    /// Inference-mode forward pass
    ///
    /// Normalizes with the running statistics instead of batch statistics.
    /// Produces no cache: there is nothing to backpropagate through at
    /// inference time, and without a cache value a backward call cannot
    /// even be written.
    ///
    /// # Arguments
    ///
    /// * `x` - Input batch [batch, features]
    /// * `stats` - Running statistics from training
    pub fn forward_infer(&self, x: &Array2<f64>, stats: &RunningStats) -> Array2<f64> {
        assert_eq!(
            x.ncols(),
            self.gamma.len(),
            "Input features ({}) don't match layer features ({})",
            x.ncols(),
            self.gamma.len()
        );
        let std = stats.var.mapv(|v| (v + self.eps).sqrt());
        let x_norm = (x - &stats.mean) / &std;
        &x_norm * &self.gamma + &self.beta
    }

    /// Backward pass
    ///
    /// Chains the upstream gradient through the scale/shift, the
    /// normalization, and the batch statistics.
    ///
    /// # Arguments
    ///
    /// * `grad_out` - Gradient from the next layer [batch, features]
    /// * `cache` - Cached values from a training-mode forward pass
    ///
    /// # Returns
    ///
    /// Gradients for gamma, beta, and the input
    pub fn backward(&self, grad_out: &Array2<f64>, cache: &BatchNormCache) -> BatchNormGradients {
        let n = cache.x.nrows() as f64;

        let centered = &cache.x - &cache.mean;
        let std_inv = cache.var.mapv(|v| 1.0 / (v + self.eps).sqrt());

        // Through the scale: dx_norm = dy * gamma
        let dx_norm = grad_out * &self.gamma;

        // Variance gradient first; the mean gradient needs it below.
        let dvar =
            (&dx_norm * &centered).sum_axis(Axis(0)) * std_inv.mapv(|s| s * s * s) * -0.5;

        // Mean gradient, including the variance cross-term
        let dmu = -(dx_norm.sum_axis(Axis(0)) * &std_inv)
            - centered.sum_axis(Axis(0)) * &dvar * (2.0 / n);

        // Each input contributes directly, through the variance, and
        // through the mean
        let grad_x = &dx_norm * &std_inv + &centered * &(dvar * (2.0 / n)) + &(dmu / n);

        let grad_gamma = (grad_out * &cache.x_norm).sum_axis(Axis(0));
        let grad_beta = grad_out.sum_axis(Axis(0));

        BatchNormGradients {
            gamma: grad_gamma,
            beta: grad_beta,
            x: grad_x,
        }
    }
}

/// Cache for the batch-norm backward pass
///
/// Produced only by training-mode forward calls. Valid for exactly one
/// backward call; stale once the layer parameters change.
pub struct BatchNormCache {
    pub x: Array2<f64>,
    pub x_norm: Array2<f64>,
    pub mean: Array1<f64>,
    pub var: Array1<f64>,
}

/// Gradients for the batch normalization layer
pub struct BatchNormGradients {
    pub gamma: Array1<f64>,
    pub beta: Array1<f64>,
    /// Gradient to pass to the previous layer
    pub x: Array2<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradients::{max_relative_error, numeric_gradient};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::array;
    use ndarray_rand::RandomExt;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::Uniform;

    #[test]
    fn test_forward_normalizes_to_beta_and_gamma_squared() {
        let mut rng = StdRng::seed_from_u64(42);
        let x = Array2::random_using((64, 3), Uniform::new(-5.0, 5.0), &mut rng);

        let layer = BatchNorm {
            gamma: array![1.5, 0.5, 2.0],
            beta: array![0.2, -1.0, 3.0],
            eps: 1e-7,
            momentum: 0.9,
        };
        let (out, _, _) = layer.forward_train(&x, &RunningStats::new(3));

        let n = out.nrows() as f64;
        let mean = out.sum_axis(Axis(0)) / n;
        let var = (&out - &mean).mapv(|v| v * v).sum_axis(Axis(0)) / n;

        // After standardization the per-feature output mean is beta and
        // the variance is gamma²
        for (got, want) in mean.iter().zip(layer.beta.iter()) {
            assert_abs_diff_eq!(got, want, epsilon = 1e-10);
        }
        for (got, want) in var.iter().zip(layer.gamma.iter()) {
            assert_relative_eq!(*got, want * want, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_running_statistics_update() {
        let layer = BatchNorm::new(2);
        let stats = RunningStats {
            mean: array![0.5, -0.25],
            var: array![2.0, 4.0],
        };
        let x = array![[1.0, 2.0], [3.0, 6.0]];

        let (_, _, updated) = layer.forward_train(&x, &stats);

        // batch mean = [2, 4], batch var = [1, 4]
        let expected_mean = array![0.9 * 0.5 + 0.1 * 2.0, 0.9 * -0.25 + 0.1 * 4.0];
        let expected_var = array![0.9 * 2.0 + 0.1 * 1.0, 0.9 * 4.0 + 0.1 * 4.0];
        for (got, want) in updated.mean.iter().zip(expected_mean.iter()) {
            assert_abs_diff_eq!(got, want, epsilon = 1e-12);
        }
        for (got, want) in updated.var.iter().zip(expected_var.iter()) {
            assert_abs_diff_eq!(got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_inference_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(5);
        let x = Array2::random_using((8, 4), Uniform::new(-1.0, 1.0), &mut rng);
        let layer = BatchNorm::new(4);
        let stats = RunningStats {
            mean: Array1::random_using(4, Uniform::new(-1.0, 1.0), &mut rng),
            var: Array1::random_using(4, Uniform::new(0.5, 2.0), &mut rng),
        };
        let stats_before = stats.clone();

        let out1 = layer.forward_infer(&x, &stats);
        let out2 = layer.forward_infer(&x, &stats);

        // Bit-identical outputs, statistics untouched
        assert_eq!(out1, out2);
        assert_eq!(stats, stats_before);
    }

    #[test]
    fn test_inference_uses_running_statistics() {
        let layer = BatchNorm::new(2);
        let stats = RunningStats {
            mean: array![1.0, -1.0],
            var: array![4.0, 0.25],
        };
        let x = array![[3.0, 0.0]];

        let out = layer.forward_infer(&x, &stats);

        // (3 - 1) / sqrt(4 + eps) ≈ 1, (0 + 1) / sqrt(0.25 + eps) ≈ 2
        assert_abs_diff_eq!(out[[0, 0]], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[[0, 1]], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_gradient_check_input() {
        let mut rng = StdRng::seed_from_u64(99);
        let x = Array2::random_using((7, 3), Uniform::new(-2.0, 2.0), &mut rng);
        let r = Array2::random_using((7, 3), Uniform::new(-1.0, 1.0), &mut rng);
        let layer = BatchNorm {
            gamma: array![1.3, 0.7, 2.1],
            beta: array![0.4, -0.6, 1.0],
            eps: 1e-7,
            momentum: 0.9,
        };
        let stats = RunningStats::new(3);

        let (_, cache, _) = layer.forward_train(&x, &stats);
        let grads = layer.backward(&r, &cache);

        let numeric = numeric_gradient(
            |probe| (&layer.forward_train(probe, &stats).0 * &r).sum(),
            &x,
            1e-5,
        );
        assert!(max_relative_error(&grads.x, &numeric) < 1e-5);
    }

    #[test]
    fn test_gradient_check_gamma_beta() {
        let mut rng = StdRng::seed_from_u64(123);
        let x = Array2::random_using((6, 4), Uniform::new(-2.0, 2.0), &mut rng);
        let r = Array2::random_using((6, 4), Uniform::new(-1.0, 1.0), &mut rng);
        let gamma = Array1::random_using(4, Uniform::new(0.5, 1.5), &mut rng);
        let beta = Array1::random_using(4, Uniform::new(-1.0, 1.0), &mut rng);
        let stats = RunningStats::new(4);

        let layer = BatchNorm {
            gamma: gamma.clone(),
            beta: beta.clone(),
            eps: 1e-7,
            momentum: 0.9,
        };
        let (_, cache, _) = layer.forward_train(&x, &stats);
        let grads = layer.backward(&r, &cache);

        let numeric_gamma = numeric_gradient(
            |probe| {
                let perturbed = BatchNorm {
                    gamma: probe.clone(),
                    beta: beta.clone(),
                    eps: 1e-7,
                    momentum: 0.9,
                };
                (&perturbed.forward_train(&x, &stats).0 * &r).sum()
            },
            &gamma,
            1e-5,
        );
        assert!(max_relative_error(&grads.gamma, &numeric_gamma) < 1e-5);

        let numeric_beta = numeric_gradient(
            |probe| {
                let perturbed = BatchNorm {
                    gamma: gamma.clone(),
                    beta: probe.clone(),
                    eps: 1e-7,
                    momentum: 0.9,
                };
                (&perturbed.forward_train(&x, &stats).0 * &r).sum()
            },
            &beta,
            1e-5,
        );
        assert!(max_relative_error(&grads.beta, &numeric_beta) < 1e-5);
    }

    #[test]
    #[should_panic(expected = "Input features")]
    fn test_forward_train_shape_mismatch() {
        let layer = BatchNorm::new(3);
        let x = Array2::zeros((4, 5));
        layer.forward_train(&x, &RunningStats::new(3));
    }
}
