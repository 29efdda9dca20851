//! Element-wise activation layers.

use crate::error::LayerError;
use crate::layer::Layer;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// Rectified linear unit, `max(0, x)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Relu {
    cached_input: Option<Tensor>,
}

impl Relu {
    /// Creates a new ReLU layer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Layer for Relu {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        self.cached_input = Some(input.clone());
        Ok(input.map(|x| x.max(0.0)))
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let input = self
            .cached_input
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;
        if grad.shape() != input.shape() {
            return Err(LayerError::ShapeMismatch {
                expected: input.shape().to_vec(),
                actual: grad.shape().to_vec(),
            });
        }
        let data = input
            .data()
            .iter()
            .zip(grad.data().iter())
            .map(|(&x, &g)| if x > 0.0 { g } else { 0.0 })
            .collect();
        Ok(Tensor::from_data(grad.shape(), data))
    }

    fn name(&self) -> &str {
        "ReLU"
    }

    fn output_dim(&self, input_dim: usize) -> usize {
        input_dim
    }
}

/// Logistic sigmoid, `1 / (1 + e^-x)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sigmoid {
    cached_output: Option<Tensor>,
}

impl Sigmoid {
    /// Creates a new sigmoid layer.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Scalar sigmoid, shared with the loss computation.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl Layer for Sigmoid {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        let output = input.map(sigmoid);
        self.cached_output = Some(output.clone());
        Ok(output)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        let output = self
            .cached_output
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;
        if grad.shape() != output.shape() {
            return Err(LayerError::ShapeMismatch {
                expected: output.shape().to_vec(),
                actual: grad.shape().to_vec(),
            });
        }
        // d sigmoid = y (1 - y)
        let data = output
            .data()
            .iter()
            .zip(grad.data().iter())
            .map(|(&y, &g)| g * y * (1.0 - y))
            .collect();
        Ok(Tensor::from_data(grad.shape(), data))
    }

    fn name(&self) -> &str {
        "Sigmoid"
    }

    fn output_dim(&self, input_dim: usize) -> usize {
        input_dim
    }
}
