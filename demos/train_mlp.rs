//! Train a Small MLP by Hand-Rolled Gradient Descent
//!
//! This example plays the role of the composing network: it chains the
//! layer forward passes in order, retains each cache, runs the backward
//! passes in reverse, and applies plain SGD updates to the parameters.
//!
//! The task is a synthetic binary classification problem: two Gaussian
//! blobs in the plane, labeled +1 and -1, fit with mean squared error.
//!
//! ## Architecture
//!
//! ```text
//! x [batch, 2] → Linear → BatchNorm → LeakyReLU → Linear → y [batch, 1]
//! ```
//!
//! Batch normalization's running statistics are threaded through the loop
//! as an explicit value: each training step consumes the current
//! statistics and keeps the updated ones, and the final evaluation uses
//! them through the inference-mode forward pass.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --example train_mlp
//! cargo run --release --example train_mlp -- --epochs 500 --lr 0.05 --hidden 16
//! ```
//!
//! # Expected Runtime
//!
//! Less than a second.

use clap::Parser;
use handgrad::{
    clip_gradients, grad_norm, leaky_relu_backward, leaky_relu_forward, BatchNorm, Linear,
    RunningStats, DEFAULT_NEGATIVE_SLOPE,
};
use ndarray::{Array2, Axis};
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Normal;

#[derive(Parser)]
#[command(
    name = "train_mlp",
    about = "Train a small MLP with hand-derived gradients on synthetic data"
)]
struct Args {
    /// Training epochs (full-batch updates)
    #[arg(long, default_value_t = 200)]
    epochs: usize,

    /// Learning rate
    #[arg(long, default_value_t = 0.1)]
    lr: f64,

    /// Hidden layer width
    #[arg(long, default_value_t = 8)]
    hidden: usize,

    /// Samples per class
    #[arg(long, default_value_t = 64)]
    samples: usize,

    /// Maximum gradient norm before clipping
    #[arg(long, default_value_t = 5.0)]
    max_grad_norm: f64,

    /// Random seed for data generation
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Two Gaussian blobs centered at (1, 1) and (-1, -1), labels +1 and -1.
fn make_blobs(samples_per_class: usize, rng: &mut StdRng) -> (Array2<f64>, Array2<f64>) {
    let n = samples_per_class * 2;
    let noise = Normal::new(0.0, 0.6).expect("valid normal distribution");

    let mut x = Array2::random_using((n, 2), noise, rng);
    let mut y = Array2::zeros((n, 1));
    for i in 0..n {
        let (center, label) = if i < samples_per_class {
            (1.0, 1.0)
        } else {
            (-1.0, -1.0)
        };
        x[[i, 0]] += center;
        x[[i, 1]] += center;
        y[[i, 0]] = label;
    }
    (x, y)
}

fn main() {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    println!("\n{}", "=".repeat(70));
    println!("  Hand-Rolled Backpropagation: Two-Blob Classification");
    println!("{}", "=".repeat(70));

    let (x, y) = make_blobs(args.samples, &mut rng);
    let n = x.nrows() as f64;
    println!(
        "\nDataset: {} samples, {} features, targets in {{-1, +1}}",
        x.nrows(),
        x.ncols()
    );

    let mut fc1 = Linear::new(2, args.hidden);
    let mut norm = BatchNorm::new(args.hidden);
    let mut fc2 = Linear::new(args.hidden, 1);
    let mut stats = RunningStats::new(args.hidden);

    println!(
        "Model: Linear(2→{h}) → BatchNorm({h}) → LeakyReLU → Linear({h}→1)",
        h = args.hidden
    );
    println!(
        "Training: {} epochs, lr {}, grad clip at {}\n",
        args.epochs, args.lr, args.max_grad_norm
    );

    for epoch in 0..args.epochs {
        // Forward, retaining caches in call order
        let (h1, fc1_cache) = fc1.forward(&x);
        let (h2, norm_cache, new_stats) = norm.forward_train(&h1, &stats);
        let (h3, act_cache) = leaky_relu_forward(&h2, DEFAULT_NEGATIVE_SLOPE);
        let (pred, fc2_cache) = fc2.forward(&h3);
        stats = new_stats;

        // Mean squared error and its gradient
        let diff = &pred - &y;
        let loss = diff.mapv(|d| d * d).sum() / n;
        let grad_pred = diff * (2.0 / n);

        // Backward in reverse order
        let fc2_grads = fc2.backward(&grad_pred, &fc2_cache);
        let grad_h2 = leaky_relu_backward(&fc2_grads.x, &act_cache);
        let norm_grads = norm.backward(&grad_h2, &norm_cache);
        let fc1_grads = fc1.backward(&norm_grads.x, &fc1_cache);

        let mut fc1_weight = fc1_grads.weight;
        let mut fc1_bias = fc1_grads.bias;
        let mut gamma = norm_grads.gamma;
        let mut beta = norm_grads.beta;
        let mut fc2_weight = fc2_grads.weight;
        let mut fc2_bias = fc2_grads.bias;

        clip_gradients(
            &mut [
                fc1_weight.view_mut().into_dyn(),
                fc1_bias.view_mut().into_dyn(),
                gamma.view_mut().into_dyn(),
                beta.view_mut().into_dyn(),
                fc2_weight.view_mut().into_dyn(),
                fc2_bias.view_mut().into_dyn(),
            ],
            args.max_grad_norm,
        );

        // Plain SGD
        fc1.weight.scaled_add(-args.lr, &fc1_weight);
        fc1.bias.scaled_add(-args.lr, &fc1_bias);
        norm.gamma.scaled_add(-args.lr, &gamma);
        norm.beta.scaled_add(-args.lr, &beta);
        fc2.weight.scaled_add(-args.lr, &fc2_weight);
        fc2.bias.scaled_add(-args.lr, &fc2_bias);

        if epoch % 20 == 0 || epoch + 1 == args.epochs {
            let norm_after = grad_norm(&[
                fc1_weight.view().into_dyn(),
                fc1_bias.view().into_dyn(),
                gamma.view().into_dyn(),
                beta.view().into_dyn(),
                fc2_weight.view().into_dyn(),
                fc2_bias.view().into_dyn(),
            ]);
            println!(
                "epoch {:4}  loss {:.6}  grad norm {:.4}",
                epoch, loss, norm_after
            );
        }
    }

    // Evaluate with the running statistics through the inference path
    let (h1, _) = fc1.forward(&x);
    let h2 = norm.forward_infer(&h1, &stats);
    let (h3, _) = leaky_relu_forward(&h2, DEFAULT_NEGATIVE_SLOPE);
    let (pred, _) = fc2.forward(&h3);

    let correct = pred
        .index_axis(Axis(1), 0)
        .iter()
        .zip(y.index_axis(Axis(1), 0).iter())
        .filter(|(p, t)| p.signum() == t.signum())
        .count();

    println!("\n{}", "─".repeat(70));
    println!(
        "Inference-mode accuracy: {}/{} ({:.1}%)",
        correct,
        x.nrows(),
        100.0 * correct as f64 / x.nrows() as f64
    );
    println!("{}", "=".repeat(70));
}
