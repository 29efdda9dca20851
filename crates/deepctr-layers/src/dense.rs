//! Fully connected layer.

use crate::error::LayerError;
use crate::layer::Layer;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// A fully connected layer computing `y = xW + b`.
///
/// - `x` has shape `[batch_size, in_features]`
/// - `W` has shape `[in_features, out_features]`
/// - `b` has shape `[out_features]`
///
/// Weights use Glorot uniform initialization, biases start at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnerProduct {
    weights: Tensor,
    bias: Tensor,
    weights_grad: Option<Tensor>,
    bias_grad: Option<Tensor>,
    cached_input: Option<Tensor>,
    in_features: usize,
    out_features: usize,
}

impl InnerProduct {
    /// Creates a new layer for the given feature widths.
    pub fn new(in_features: usize, out_features: usize, seed: u64) -> Self {
        let limit = (6.0 / (in_features + out_features) as f32).sqrt();
        Self {
            weights: Tensor::uniform(&[in_features, out_features], limit, seed),
            bias: Tensor::zeros(&[out_features]),
            weights_grad: None,
            bias_grad: None,
            cached_input: None,
            in_features,
            out_features,
        }
    }

    /// Creates a layer from explicit weights and bias.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] or [`LayerError::ShapeMismatch`]
    /// if the tensors do not form a valid `[in, out]` / `[out]` pair.
    pub fn from_weights(weights: Tensor, bias: Tensor) -> Result<Self, LayerError> {
        if weights.ndim() != 2 || bias.ndim() != 1 {
            return Err(LayerError::ConfigError {
                message: format!(
                    "expected 2D weights and 1D bias, got {}D and {}D",
                    weights.ndim(),
                    bias.ndim()
                ),
            });
        }
        if weights.shape()[1] != bias.shape()[0] {
            return Err(LayerError::ShapeMismatch {
                expected: vec![weights.shape()[1]],
                actual: bias.shape().to_vec(),
            });
        }
        let in_features = weights.shape()[0];
        let out_features = weights.shape()[1];
        Ok(Self {
            weights,
            bias,
            weights_grad: None,
            bias_grad: None,
            cached_input: None,
            in_features,
            out_features,
        })
    }

    /// Input feature width.
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Output feature width.
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// The weight matrix.
    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    /// The bias vector.
    pub fn bias(&self) -> &Tensor {
        &self.bias
    }
}

impl Layer for InnerProduct {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        if input.ndim() != 2 {
            return Err(LayerError::ShapeMismatch {
                expected: vec![0, self.in_features],
                actual: input.shape().to_vec(),
            });
        }
        if input.shape()[1] != self.in_features {
            return Err(LayerError::InvalidInputDimension {
                expected: self.in_features,
                actual: input.shape()[1],
            });
        }

        self.cached_input = Some(input.clone());
        Ok(input.matmul(&self.weights).add(&self.bias))
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let input = self
            .cached_input
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;
        if grad.ndim() != 2 || grad.shape()[1] != self.out_features {
            return Err(LayerError::ShapeMismatch {
                expected: vec![input.shape()[0], self.out_features],
                actual: grad.shape().to_vec(),
            });
        }

        // dL/dW = x^T g, dL/db = column sums of g, dL/dx = g W^T
        self.weights_grad = Some(input.transpose().matmul(grad));
        self.bias_grad = Some(grad.sum_rows());
        Ok(grad.matmul(&self.weights.transpose()))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weights, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weights, &mut self.bias]
    }

    fn gradients(&self) -> Vec<Tensor> {
        match (&self.weights_grad, &self.bias_grad) {
            (Some(w), Some(b)) => vec![w.clone(), b.clone()],
            _ => Vec::new(),
        }
    }

    fn name(&self) -> &str {
        "InnerProduct"
    }

    fn output_dim(&self, _input_dim: usize) -> usize {
        self.out_features
    }
}
