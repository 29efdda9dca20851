//! Adagrad optimizer.

use crate::{Optimizer, OptimizerConfig, OptimizerError};
use serde::{Deserialize, Serialize};

/// Adagrad with per-coordinate adaptive learning rates.
///
/// Updates parameters using:
/// ```text
/// accum += gradient^2
/// param -= learning_rate * gradient / (sqrt(accum) + epsilon)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adagrad {
    learning_rate: f32,
    initial_accumulator: f32,
    epsilon: f32,
    /// Squared-gradient accumulator, sized lazily.
    accumulator: Vec<f32>,
    config: OptimizerConfig,
}

impl Adagrad {
    /// Returns the current accumulator state.
    pub fn accumulator(&self) -> &[f32] {
        &self.accumulator
    }
}

impl Optimizer for Adagrad {
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError> {
        match config {
            OptimizerConfig::Adagrad {
                learning_rate,
                initial_accumulator,
                epsilon,
            } => Ok(Self {
                learning_rate,
                initial_accumulator,
                epsilon,
                accumulator: Vec::new(),
                config,
            }),
            _ => Err(OptimizerError::ConfigMismatch {
                expected: "Adagrad".to_string(),
                got: config.name().to_string(),
            }),
        }
    }

    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]) {
        if self.accumulator.len() != params.len() {
            self.accumulator = vec![self.initial_accumulator; params.len()];
        }

        for (i, (p, g)) in params.iter_mut().zip(gradients.iter()).enumerate() {
            self.accumulator[i] += g * g;
            *p -= self.learning_rate * g / (self.accumulator[i].sqrt() + self.epsilon);
        }
    }

    fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}
