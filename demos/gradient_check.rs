//! Numeric Gradient Checking Demonstration
//!
//! Every backward pass in this crate was derived by hand, and hand-derived
//! calculus deserves verification. This example compares each analytic
//! gradient against a central finite-difference approximation and prints
//! the maximum relative error per layer.
//!
//! Errors around 1e-8 mean the analytic and numeric gradients agree to
//! the limits of double-precision differencing; anything near 1e-2 would
//! indicate a dropped term or a sign error.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --example gradient_check
//! ```
//!
//! # Expected Runtime
//!
//! Less than a second.

use handgrad::{
    leaky_relu_backward, leaky_relu_forward, max_relative_error, numeric_gradient, relu_backward,
    relu_forward, BatchNorm, Linear, RunningStats, DEFAULT_NEGATIVE_SLOPE,
};
use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Uniform;

fn main() {
    let mut rng = StdRng::seed_from_u64(1234);

    println!("\n{}", "=".repeat(70));
    println!("  Gradient Checks: Analytic Backward vs Central Differences");
    println!("{}", "=".repeat(70));
    println!();

    // ========== Linear ==========
    let linear = Linear::new(4, 3);
    let x = Array2::random_using((6, 4), Uniform::new(-1.0, 1.0), &mut rng);
    let r = Array2::random_using((6, 3), Uniform::new(-1.0, 1.0), &mut rng);

    let (_, cache) = linear.forward(&x);
    let grads = linear.backward(&r, &cache);
    let numeric = numeric_gradient(|probe| (&linear.forward(probe).0 * &r).sum(), &x, 1e-5);
    println!(
        "Linear       dX      max relative error: {:.3e}",
        max_relative_error(&grads.x, &numeric)
    );

    // ========== ReLU ==========
    let x = Array2::random_using((6, 4), Uniform::new(0.1, 1.0), &mut rng)
        .mapv(|v| if rand::random::<bool>() { v } else { -v });
    let r = Array2::random_using((6, 4), Uniform::new(-1.0, 1.0), &mut rng);

    let (_, cache) = relu_forward(&x);
    let grad_x = relu_backward(&r, &cache);
    let numeric = numeric_gradient(|probe| (&relu_forward(probe).0 * &r).sum(), &x, 1e-5);
    println!(
        "ReLU         dX      max relative error: {:.3e}",
        max_relative_error(&grad_x, &numeric)
    );

    // ========== Leaky ReLU ==========
    let (_, cache) = leaky_relu_forward(&x, DEFAULT_NEGATIVE_SLOPE);
    let grad_x = leaky_relu_backward(&r, &cache);
    let numeric = numeric_gradient(
        |probe| (&leaky_relu_forward(probe, DEFAULT_NEGATIVE_SLOPE).0 * &r).sum(),
        &x,
        1e-5,
    );
    println!(
        "LeakyReLU    dX      max relative error: {:.3e}",
        max_relative_error(&grad_x, &numeric)
    );

    // ========== Batch Normalization ==========
    let norm = BatchNorm::new(4);
    let stats = RunningStats::new(4);
    let x = Array2::random_using((8, 4), Uniform::new(-2.0, 2.0), &mut rng);
    let r = Array2::random_using((8, 4), Uniform::new(-1.0, 1.0), &mut rng);

    let (_, cache, _) = norm.forward_train(&x, &stats);
    let grads = norm.backward(&r, &cache);

    let numeric = numeric_gradient(
        |probe| (&norm.forward_train(probe, &stats).0 * &r).sum(),
        &x,
        1e-5,
    );
    println!(
        "BatchNorm    dX      max relative error: {:.3e}",
        max_relative_error(&grads.x, &numeric)
    );

    let numeric_gamma = numeric_gradient(
        |probe| {
            let perturbed = BatchNorm {
                gamma: probe.clone(),
                beta: norm.beta.clone(),
                eps: norm.eps,
                momentum: norm.momentum,
            };
            (&perturbed.forward_train(&x, &stats).0 * &r).sum()
        },
        &norm.gamma,
        1e-5,
    );
    println!(
        "BatchNorm    dGamma  max relative error: {:.3e}",
        max_relative_error(&grads.gamma, &numeric_gamma)
    );

    let numeric_beta = numeric_gradient(
        |probe| {
            let perturbed = BatchNorm {
                gamma: norm.gamma.clone(),
                beta: probe.clone(),
                eps: norm.eps,
                momentum: norm.momentum,
            };
            (&perturbed.forward_train(&x, &stats).0 * &r).sum()
        },
        &norm.beta,
        1e-5,
    );
    println!(
        "BatchNorm    dBeta   max relative error: {:.3e}",
        max_relative_error(&grads.beta, &numeric_beta)
    );

    println!("\n{}", "=".repeat(70));
}
