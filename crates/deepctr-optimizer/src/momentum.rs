//! SGD with momentum.

use crate::{Optimizer, OptimizerConfig, OptimizerError};
use serde::{Deserialize, Serialize};

/// Momentum SGD, with optional Nesterov lookahead.
///
/// Updates parameters using:
/// ```text
/// v = momentum * v + gradient
/// param -= learning_rate * v               (classic)
/// param -= learning_rate * (momentum * v + gradient)   (Nesterov)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentumSgd {
    learning_rate: f32,
    momentum: f32,
    use_nesterov: bool,
    /// Velocity, sized lazily from the first parameter slice.
    velocity: Vec<f32>,
    config: OptimizerConfig,
}

impl Optimizer for MomentumSgd {
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError> {
        match config {
            OptimizerConfig::MomentumSgd {
                learning_rate,
                momentum,
                use_nesterov,
            } => Ok(Self {
                learning_rate,
                momentum,
                use_nesterov,
                velocity: Vec::new(),
                config,
            }),
            _ => Err(OptimizerError::ConfigMismatch {
                expected: "MomentumSgd".to_string(),
                got: config.name().to_string(),
            }),
        }
    }

    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]) {
        if self.velocity.len() != params.len() {
            self.velocity = vec![0.0; params.len()];
        }

        for (i, (p, g)) in params.iter_mut().zip(gradients.iter()).enumerate() {
            self.velocity[i] = self.momentum * self.velocity[i] + g;
            let update = if self.use_nesterov {
                self.momentum * self.velocity[i] + g
            } else {
                self.velocity[i]
            };
            *p -= self.learning_rate * update;
        }
    }

    fn config(&self) -> &OptimizerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn momentum_config(use_nesterov: bool) -> OptimizerConfig {
        OptimizerConfig::MomentumSgd {
            learning_rate: 0.1,
            momentum: 0.9,
            use_nesterov,
        }
    }

    #[test]
    fn test_first_step_matches_sgd() {
        let mut opt = MomentumSgd::new(momentum_config(false)).unwrap();
        let mut params = vec![1.0];
        opt.apply_gradients(&mut params, &[1.0]);
        assert!((params[0] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_velocity_accumulates() {
        let mut opt = MomentumSgd::new(momentum_config(false)).unwrap();
        let mut params = vec![0.0];

        opt.apply_gradients(&mut params, &[1.0]);
        let after_one = params[0];
        opt.apply_gradients(&mut params, &[1.0]);

        // Second step is larger than the first because velocity carries over.
        assert!((params[0] - after_one).abs() > after_one.abs());
    }

    #[test]
    fn test_nesterov_leads_classic() {
        let mut classic = MomentumSgd::new(momentum_config(false)).unwrap();
        let mut nesterov = MomentumSgd::new(momentum_config(true)).unwrap();

        let mut p_classic = vec![1.0];
        let mut p_nesterov = vec![1.0];
        classic.apply_gradients(&mut p_classic, &[1.0]);
        nesterov.apply_gradients(&mut p_nesterov, &[1.0]);

        assert!(p_nesterov[0] < p_classic[0]);
    }

    #[test]
    fn test_config_mismatch() {
        let result = MomentumSgd::new(OptimizerConfig::adam());
        assert!(result.is_err());
    }
}
