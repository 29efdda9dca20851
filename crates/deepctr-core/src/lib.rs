//! Core configuration types for the deepctr training stack.
//!
//! This crate carries the pieces every other deepctr crate builds on:
//!
//! - [`Solver`]: the immutable training-session configuration (batch sizes,
//!   GPU-to-node mapping, precision flags), built through [`SolverBuilder`].
//! - [`DeviceMap`]: the device topology derived from the solver's `vvgpu`
//!   mapping.
//! - [`comm`]: rank/world-size queries for launcher-managed multi-process
//!   jobs, plus main-thread identification.
//!
//! # Example
//!
//! ```
//! use deepctr_core::SolverBuilder;
//!
//! let solver = SolverBuilder::new()
//!     .batchsize(1024)
//!     .batchsize_eval(1024)
//!     .vvgpu(vec![vec![0, 1], vec![2, 3]])
//!     .build()
//!     .unwrap();
//! assert_eq!(solver.device_map().total_devices(), 4);
//! ```

#![warn(missing_docs)]

pub mod comm;
pub mod error;
pub mod solver;

pub use error::{CoreError, Result};
pub use solver::{DeviceMap, Solver, SolverBuilder};
