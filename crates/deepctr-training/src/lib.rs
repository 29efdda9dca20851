//! Model construction and the training loop.
//!
//! This crate turns the configuration bundles from `deepctr-core`,
//! `deepctr-data`, and `deepctr-optimizer` into a runnable model: a JSON
//! [`GraphConfig`] describes the layer stack, [`DcnNetwork`] executes it,
//! and [`Model`] drives construction, compilation, and the `fit` loop with
//! display logging, periodic evaluation, and snapshots. [`launch`] runs
//! the whole thing on a named per-rank worker thread.

#![warn(missing_docs)]

pub mod graph;
pub mod hooks;
pub mod launch;
pub mod metrics;
pub mod model;
pub mod network;
pub mod snapshot;

pub use graph::{GraphConfig, GraphError, LayerConfig};
pub use hooks::{Hook, HookAction, HookError, HookList};
pub use launch::{run_in_train_thread, train_thread_name, LaunchError};
pub use metrics::Metrics;
pub use model::{EvalResult, FitParams, FitReport, Model, ModelError};
pub use network::DcnNetwork;
pub use snapshot::{write_snapshot, SnapshotError, SnapshotPaths};
