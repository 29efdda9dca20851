//! Error types for layer operations.

use thiserror::Error;

/// Errors that can occur during layer operations.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Tensor shapes do not match the layer's expectations.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The shape the layer expected.
        expected: Vec<usize>,
        /// The shape it received.
        actual: Vec<usize>,
    },

    /// Input feature dimension does not match the layer.
    #[error("Invalid input dimension: expected {expected}, got {actual}")]
    InvalidInputDimension {
        /// The feature dimension the layer was built for.
        expected: usize,
        /// The feature dimension of the input.
        actual: usize,
    },

    /// Backward was called before a forward pass cached its input.
    #[error("Layer state not initialized: forward must run before backward")]
    NotInitialized,

    /// Invalid layer configuration.
    #[error("Invalid layer config: {message}")]
    ConfigError {
        /// What was wrong with the configuration.
        message: String,
    },
}
