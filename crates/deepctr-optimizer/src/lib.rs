//! Optimizer update rules for deepctr training.
//!
//! Each update rule implements the [`Optimizer`] trait over a parameter
//! slice, keeping its own state (accumulators, moments, timestep) sized
//! lazily from the first slice it sees. The model creates one optimizer
//! instance per parameter tensor and one per touched embedding row.
//!
//! # Available Optimizers
//!
//! - [`Sgd`] - Stochastic Gradient Descent
//! - [`MomentumSgd`] - SGD with (optionally Nesterov) momentum
//! - [`Adagrad`] - Adaptive Gradient Algorithm
//! - [`Adam`] - Adaptive Moment Estimation (the default rule)
//!
//! # Example
//!
//! ```
//! use deepctr_optimizer::{create_optimizer, OptimizerConfig};
//!
//! let mut optimizer = create_optimizer(OptimizerConfig::adam());
//! let mut weights = vec![1.0, 2.0, 3.0];
//! let gradients = vec![0.1, 0.2, 0.3];
//! optimizer.apply_gradients(&mut weights, &gradients);
//! assert!(weights[0] < 1.0);
//! ```

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod adagrad;
mod adam;
mod momentum;
mod sgd;

pub use adagrad::Adagrad;
pub use adam::Adam;
pub use momentum::MomentumSgd;
pub use sgd::Sgd;

/// Errors that can occur when working with optimizers.
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// Configuration type does not match the optimizer type.
    #[error("Config mismatch: expected {expected}, got {got}")]
    ConfigMismatch {
        /// The optimizer type that was being constructed.
        expected: String,
        /// The configuration variant that was supplied.
        got: String,
    },

    /// Invalid configuration parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Configuration for the supported update rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OptimizerConfig {
    /// Stochastic Gradient Descent.
    Sgd {
        /// Learning rate for gradient updates.
        learning_rate: f32,
    },

    /// SGD with momentum.
    MomentumSgd {
        /// Learning rate for gradient updates.
        learning_rate: f32,
        /// Momentum coefficient.
        momentum: f32,
        /// Whether to use Nesterov momentum.
        use_nesterov: bool,
    },

    /// Adagrad.
    Adagrad {
        /// Learning rate for gradient updates.
        learning_rate: f32,
        /// Initial value for the accumulator.
        initial_accumulator: f32,
        /// Small constant for numerical stability.
        epsilon: f32,
    },

    /// Adam.
    Adam {
        /// Learning rate for gradient updates.
        learning_rate: f32,
        /// Exponential decay rate for first moment estimates.
        beta1: f32,
        /// Exponential decay rate for second moment estimates.
        beta2: f32,
        /// Small constant for numerical stability.
        epsilon: f32,
    },
}

impl OptimizerConfig {
    /// Adam with the library's default hyperparameters.
    pub fn adam() -> Self {
        OptimizerConfig::Adam {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }

    /// Returns the name of the optimizer type.
    pub fn name(&self) -> &'static str {
        match self {
            OptimizerConfig::Sgd { .. } => "Sgd",
            OptimizerConfig::MomentumSgd { .. } => "MomentumSgd",
            OptimizerConfig::Adagrad { .. } => "Adagrad",
            OptimizerConfig::Adam { .. } => "Adam",
        }
    }

    /// Returns the learning rate for the optimizer.
    pub fn learning_rate(&self) -> f32 {
        match self {
            OptimizerConfig::Sgd { learning_rate }
            | OptimizerConfig::MomentumSgd { learning_rate, .. }
            | OptimizerConfig::Adagrad { learning_rate, .. }
            | OptimizerConfig::Adam { learning_rate, .. } => *learning_rate,
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::adam()
    }
}

/// Trait for parameter optimizers.
///
/// Optimizers update a parameter slice in place from a gradient slice of
/// the same length.
pub trait Optimizer: Sized {
    /// Creates a new optimizer from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizerError::ConfigMismatch`] if the configuration
    /// variant does not match the optimizer type.
    fn new(config: OptimizerConfig) -> Result<Self, OptimizerError>;

    /// Applies gradients to update the parameters in place.
    ///
    /// # Panics
    ///
    /// May panic if `params` and `gradients` have different lengths.
    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]);

    /// Returns a reference to the optimizer's configuration.
    fn config(&self) -> &OptimizerConfig;
}

/// Dynamic dispatch version of the [`Optimizer`] trait.
pub trait OptimizerDyn: Send {
    /// Applies gradients to update the parameters in place.
    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]);

    /// Returns a reference to the optimizer's configuration.
    fn config(&self) -> &OptimizerConfig;
}

impl<T: Optimizer + Send> OptimizerDyn for T {
    fn apply_gradients(&mut self, params: &mut [f32], gradients: &[f32]) {
        Optimizer::apply_gradients(self, params, gradients)
    }

    fn config(&self) -> &OptimizerConfig {
        Optimizer::config(self)
    }
}

/// Creates a boxed optimizer from the given configuration.
///
/// The configuration variant selects the concrete update rule, so the
/// constructors below cannot fail.
pub fn create_optimizer(config: OptimizerConfig) -> Box<dyn OptimizerDyn> {
    match &config {
        OptimizerConfig::Sgd { .. } => Box::new(
            Sgd::new(config).expect("Sgd config variant constructs Sgd"),
        ),
        OptimizerConfig::MomentumSgd { .. } => Box::new(
            MomentumSgd::new(config).expect("MomentumSgd config variant constructs MomentumSgd"),
        ),
        OptimizerConfig::Adagrad { .. } => Box::new(
            Adagrad::new(config).expect("Adagrad config variant constructs Adagrad"),
        ),
        OptimizerConfig::Adam { .. } => Box::new(
            Adam::new(config).expect("Adam config variant constructs Adam"),
        ),
    }
}
