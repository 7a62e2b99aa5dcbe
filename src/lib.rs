//! Handgrad: Hand-Derived Backpropagation Building Blocks
//!
//! Feed-forward network layers implemented as explicit forward/backward
//! pairs, for assembling small networks trained by hand-rolled gradient
//! descent. There is no automatic differentiation here: every gradient is
//! derived by hand and computed by an explicit backward function, which is
//! the whole point.
//!
//! Each forward pass returns its output together with a typed cache; the
//! matching backward pass consumes that cache and the upstream gradient
//! and returns gradients for the layer's input and parameters. A network
//! chains forward calls in order, keeps the caches, and runs the backward
//! calls in reverse.
//!
//! # Modules
//!
//! - [`layers`] - Linear, ReLU, leaky ReLU, and batch normalization
//! - [`gradients`] - Gradient norms, clipping, and numeric gradient checks
//!
//! # Example
//!
//! ```rust
//! use handgrad::{relu_backward, relu_forward, Linear};
//! use ndarray::Array2;
//!
//! let layer = Linear::new(3, 2);
//! let x = Array2::ones((4, 3));
//!
//! // Forward, keeping each cache for the backward pass
//! let (hidden, linear_cache) = layer.forward(&x);
//! let (out, relu_cache) = relu_forward(&hidden);
//! assert_eq!(out.dim(), (4, 2));
//!
//! // Backward in reverse order
//! let grad_out = Array2::ones((4, 2));
//! let grad_hidden = relu_backward(&grad_out, &relu_cache);
//! let grads = layer.backward(&grad_hidden, &linear_cache);
//! assert_eq!(grads.x.dim(), (4, 3));
//! assert_eq!(grads.weight.dim(), (3, 2));
//! ```

pub mod gradients;
pub mod layers;

// Re-export main types for convenience
pub use gradients::{clip_gradients, grad_norm, max_relative_error, numeric_gradient};
pub use layers::{
    leaky_relu_backward, leaky_relu_forward, relu_backward, relu_forward, BatchNorm,
    BatchNormCache, BatchNormGradients, LeakyReluCache, Linear, LinearCache, LinearGradients,
    ReluCache, RunningStats, DEFAULT_NEGATIVE_SLOPE,
};
