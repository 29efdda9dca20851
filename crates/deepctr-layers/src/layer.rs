//! The trait shared by all dense network layers.

use crate::error::LayerError;
use crate::tensor::Tensor;

/// A dense network layer supporting forward and backward propagation.
///
/// `forward` caches whatever the layer needs for the following `backward`
/// call, so a training step is always `forward`, then `backward`, then a
/// parameter update from [`Layer::parameters_mut`] and [`Layer::gradients`].
/// The two accessors return tensors in the same order.
pub trait Layer: Send {
    /// Computes the layer output, caching state for the backward pass.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError`] if the input shape is incompatible.
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError>;

    /// Propagates the output gradient back to an input gradient, recording
    /// parameter gradients along the way.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::NotInitialized`] if no forward pass has run,
    /// or a shape error if `grad` does not match the layer output.
    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError>;

    /// The layer's learnable parameters.
    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    /// The layer's learnable parameters, mutably.
    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }

    /// Gradients recorded by the last backward pass, cloned out so the
    /// caller can hold them while borrowing parameters mutably.
    fn gradients(&self) -> Vec<Tensor> {
        Vec::new()
    }

    /// The layer name, for summaries and logging.
    fn name(&self) -> &str;

    /// The output feature width for a given input width.
    fn output_dim(&self, input_dim: usize) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity;

    impl Layer for Identity {
        fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
            Ok(input.clone())
        }

        fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
            Ok(grad.clone())
        }

        fn name(&self) -> &str {
            "Identity"
        }

        fn output_dim(&self, input_dim: usize) -> usize {
            input_dim
        }
    }

    #[test]
    fn test_default_trait_methods() {
        let mut layer = Identity;
        let input = Tensor::ones(&[2, 4]);
        let out = layer.forward(&input).unwrap();
        assert_eq!(out.shape(), &[2, 4]);
        assert!(layer.parameters().is_empty());
        assert!(layer.gradients().is_empty());
        assert_eq!(layer.output_dim(4), 4);
    }
}
