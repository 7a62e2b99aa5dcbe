//! Neural Network Layers
//!
//! This module contains the layer implementations: a fully-connected
//! transform, two rectifier activations, and batch normalization. Each
//! layer provides an explicit forward and backward pass.
//!
//! ## Layers
//!
//! - **linear**: Fully connected (affine) layer
//! - **activation**: ReLU and leaky ReLU (forward and backward)
//! - **batch_norm**: Batch normalization with running statistics
//!
//! ## Design Pattern
//!
//! Each layer follows a consistent pattern:
//!
//! ```rust,ignore
//! pub struct Layer {
//!     // Parameters (weights, biases, etc.)
//! }
//!
//! impl Layer {
//!     pub fn new(...) -> Self { }
//!     pub fn forward(&self, x: &Array2<f64>) -> (Array2<f64>, Cache) { }
//!     pub fn backward(&self, grad: &Array2<f64>, cache: &Cache) -> Gradients { }
//! }
//!
//! pub struct Cache {
//!     // Values needed for the backward pass
//! }
//!
//! pub struct Gradients {
//!     // Gradients for parameters and input
//! }
//! ```
//!
//! Every cache is its own type, so a backward pass only accepts the cache
//! its matching forward pass produced; handing the wrong layer's cache to
//! a backward call is a type error, not a runtime surprise.
//!
//! A network is assembled outside this crate by chaining forward calls in
//! order, retaining the caches, and chaining backward calls in reverse,
//! feeding each backward's input gradient into the previous layer.

pub mod activation;
pub mod batch_norm;
pub mod linear;

// Re-export main types for convenience
pub use activation::{
    leaky_relu_backward, leaky_relu_forward, relu_backward, relu_forward, LeakyReluCache,
    ReluCache, DEFAULT_NEGATIVE_SLOPE,
};
pub use batch_norm::{BatchNorm, BatchNormCache, BatchNormGradients, RunningStats};
pub use linear::{Linear, LinearCache, LinearGradients};
