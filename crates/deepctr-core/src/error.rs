//! Error types for the deepctr core crate.

use thiserror::Error;

/// The main error type for core configuration operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A batch size was zero or not divisible across devices.
    #[error("Invalid batch size {batchsize}: {reason}")]
    InvalidBatchSize {
        /// The offending batch size.
        batchsize: usize,
        /// Why it was rejected.
        reason: String,
    },

    /// The GPU-to-node mapping is malformed.
    #[error("Invalid device map: {message}")]
    InvalidDeviceMap {
        /// A description of the problem.
        message: String,
    },

    /// Error during configuration parsing or validation.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// A description of the configuration error.
        message: String,
    },
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidBatchSize {
            batchsize: 0,
            reason: "must be non-zero".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid batch size 0: must be non-zero");

        let err = CoreError::InvalidDeviceMap {
            message: "node 1 is empty".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid device map: node 1 is empty");
    }
}
