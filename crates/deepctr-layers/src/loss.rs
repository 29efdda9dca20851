//! Binary cross entropy loss over logits.

use crate::activation::sigmoid;
use crate::error::LayerError;
use crate::tensor::Tensor;

/// Numerically stable binary cross entropy computed from logits.
///
/// The forward pass uses the log-sum-exp form
/// `max(z, 0) - z*y + ln(1 + e^-|z|)` so large logits never overflow, and
/// the backward pass is the usual `(sigmoid(z) - y) / batch`.
#[derive(Debug, Clone, Default)]
pub struct BinaryCrossEntropyLoss {
    cached_logits: Option<Tensor>,
    cached_labels: Option<Vec<f32>>,
}

impl BinaryCrossEntropyLoss {
    /// Creates a new loss instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the mean loss for a batch of `[batch, 1]` logits.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ShapeMismatch`] if `logits` is not a one-wide
    /// column matching `labels` in length.
    pub fn forward(&mut self, logits: &Tensor, labels: &[f32]) -> Result<f32, LayerError> {
        if logits.ndim() != 2 || logits.shape()[1] != 1 || logits.shape()[0] != labels.len() {
            return Err(LayerError::ShapeMismatch {
                expected: vec![labels.len(), 1],
                actual: logits.shape().to_vec(),
            });
        }

        let batch = labels.len() as f32;
        let loss: f32 = logits
            .data()
            .iter()
            .zip(labels.iter())
            .map(|(&z, &y)| z.max(0.0) - z * y + (1.0 + (-z.abs()).exp()).ln())
            .sum();

        self.cached_logits = Some(logits.clone());
        self.cached_labels = Some(labels.to_vec());
        Ok(loss / batch)
    }

    /// The gradient of the mean loss with respect to the logits.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::NotInitialized`] if forward has not run.
    pub fn backward(&self) -> Result<Tensor, LayerError> {
        let logits = self
            .cached_logits
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;
        let labels = self
            .cached_labels
            .as_ref()
            .ok_or(LayerError::NotInitialized)?;

        let batch = labels.len() as f32;
        let data = logits
            .data()
            .iter()
            .zip(labels.iter())
            .map(|(&z, &y)| (sigmoid(z) - y) / batch)
            .collect();
        Ok(Tensor::from_data(logits.shape(), data))
    }

    /// Predicted probabilities for the last batch of logits.
    pub fn probabilities(&self) -> Option<Vec<f32>> {
        self.cached_logits
            .as_ref()
            .map(|z| z.data().iter().map(|&v| sigmoid(v)).collect())
    }
}
