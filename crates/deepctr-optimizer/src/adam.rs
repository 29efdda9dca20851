//! Adam optimizer.
//!
//! Adam (Adaptive Moment Estimation) maintains exponential moving averages
//! of both the gradients (first moment) and squared gradients (second
//! moment), with bias correction for the early timesteps.

use crate::{Optimizer, OptimizerConfig, OptimizerError};
use serde::{Deserialize, Serialize};

/// Adam optimizer with adaptive learning rates and momentum.
///
/// Updates parameters using:
/// ```text
/// m = beta1 * m + (1 - beta1) * gradient
/// v = beta2 * v + (1 - beta2) * gradient^2
/// m_hat = m / (1 - beta1^t)
/// v_hat = v / (1 - beta2^t)
/// param -= learning_rate * m_hat / (sqrt(v_hat) + epsilon)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// First moment estimates, sized lazily.
    m: Vec<f32>,
    /// Second moment estimates, sized lazily.
    v: Vec<f32>,
    /// Current timestep for bias correction.
    t: u64,
    config: OptimizerConfig,
}

impl Adam {
    /// Returns the current timestep.
    pub fn timestep(&self) -> u64 {
        self.t
    }

    /// Resets the optimizer state.
    pub fn reset_state(&mut self) {
        self.m.clear();
        self.v.clear();
        self.t = 0;
    }
}

impl Optimizer for Adam {
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError> {
        match config {
            OptimizerConfig::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => Ok(Self {
                learning_rate,
                beta1,
                beta2,
                epsilon,
                m: Vec::new(),
                v: Vec::new(),
                t: 0,
                config,
            }),
            _ => Err(OptimizerError::ConfigMismatch {
                expected: "Adam".to_string(),
                got: config.name().to_string(),
            }),
        }
    }

    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]) {
        if self.m.len() != params.len() {
            self.m = vec![0.0; params.len()];
            self.v = vec![0.0; params.len()];
        }

        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t as i32);

        for (i, (p, g)) in params.iter_mut().zip(gradients.iter()).enumerate() {
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;

            let m_hat = self.m[i] / bias_correction1;
            let v_hat = self.v[i] / bias_correction2;

            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }

    fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adam_basic_update() {
        let mut adam = Adam::new(OptimizerConfig::adam()).unwrap();
        let mut params = vec![1.0, 2.0, 3.0];
        adam.apply_gradients(&mut params, &[1.0, 1.0, 1.0]);

        assert!(params[0] < 1.0);
        assert!(params[1] < 2.0);
        assert!(params[2] < 3.0);
    }

    #[test]
    fn test_adam_timestep_increment() {
        let mut adam = Adam::new(OptimizerConfig::adam()).unwrap();
        let mut params = vec![1.0];

        assert_eq!(adam.timestep(), 0);
        adam.apply_gradients(&mut params, &[1.0]);
        assert_eq!(adam.timestep(), 1);
        adam.apply_gradients(&mut params, &[1.0]);
        assert_eq!(adam.timestep(), 2);
    }

    #[test]
    fn test_adam_zero_gradient() {
        let mut adam = Adam::new(OptimizerConfig::adam()).unwrap();
        let mut params = vec![1.0, 2.0];
        adam.apply_gradients(&mut params, &[0.0, 0.0]);

        assert!((params[0] - 1.0).abs() < 1e-6);
        assert!((params[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_adam_reset_state() {
        let mut adam = Adam::new(OptimizerConfig::adam()).unwrap();
        let mut params = vec![1.0];
        adam.apply_gradients(&mut params, &[1.0]);
        assert_eq!(adam.timestep(), 1);

        adam.reset_state();
        assert_eq!(adam.timestep(), 0);
    }

    #[test]
    fn test_adam_config_mismatch() {
        let result = Adam::new(OptimizerConfig::Sgd {
            learning_rate: 0.01,
        });
        assert!(result.is_err());
    }
}
