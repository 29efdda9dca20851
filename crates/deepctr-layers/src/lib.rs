//! Neural network layers for CTR models.
//!
//! The building blocks of a deep-and-cross network: a row-major [`Tensor`],
//! the [`Layer`] trait with fully connected, activation, and cross layers,
//! a slot-partitioned [`SlotEmbedding`] for categorical features, and a
//! logit-space [`BinaryCrossEntropyLoss`].
//!
//! Dense layers implement [`Layer`]; the embedding has its own entry points
//! because its input is per-slot key lists rather than a tensor, and it
//! owns its optimizers so updates stay sparse-aware.

#![warn(missing_docs)]

pub mod activation;
pub mod cross;
pub mod dense;
pub mod embedding;
pub mod error;
pub mod layer;
pub mod loss;
pub mod tensor;

pub use activation::{Relu, Sigmoid};
pub use cross::{CrossLevel, MultiCross};
pub use dense::InnerProduct;
pub use embedding::SlotEmbedding;
pub use error::LayerError;
pub use layer::Layer;
pub use loss::BinaryCrossEntropyLoss;
pub use tensor::Tensor;
