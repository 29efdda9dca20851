//! The model facade tying configuration, data, and the network together.
//!
//! The expected call sequence mirrors a training script:
//!
//! ```text
//! let mut model = Model::new(solver, reader_params, optimizer);
//! model.construct_from_json("dcn.json", true)?;
//! model.summary()?;
//! model.compile()?;
//! let report = model.fit(&FitParams::new(10000, 200, 1000, 100000, "dcn"))?;
//! ```

use deepctr_core::{CoreError, Solver};
use deepctr_data::{DataError, DataReaderParams, ParquetReader};
use deepctr_layers::LayerError;
use deepctr_optimizer::OptimizerConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::graph::{GraphConfig, GraphError};
use crate::hooks::{DisplayHook, Hook, HookAction, HookError, HookList};
use crate::metrics::{auc, LossAverager, Metrics};
use crate::network::DcnNetwork;
use crate::snapshot::{write_snapshot, SnapshotError};

/// Errors raised by the model lifecycle.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Solver configuration error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Data reader error.
    #[error(transparent)]
    Data(#[from] DataError),

    /// Graph loading or network construction error.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Numerical layer error during training.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// Hook failure.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// Snapshot failure.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// An operation needs `construct_from_json` to have run.
    #[error("Model graph not constructed; call construct_from_json first")]
    NotConstructed,

    /// An operation needs `compile` to have run.
    #[error("Model not compiled; call compile first")]
    NotCompiled,

    /// The network was built without its dense half.
    #[error("Model was constructed without the dense network and cannot train")]
    MissingDenseNetwork,
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Parameters for one `fit` run.
#[derive(Debug, Clone)]
pub struct FitParams {
    /// Number of training iterations.
    pub max_iter: u64,
    /// Log the average training loss every this many iterations.
    pub display: u64,
    /// Evaluate every this many iterations; 0 disables evaluation.
    pub eval_interval: u64,
    /// Snapshot every this many iterations; 0 disables snapshots.
    pub snapshot: u64,
    /// Path prefix for snapshot files.
    pub snapshot_prefix: String,
}

impl FitParams {
    /// Creates fit parameters.
    pub fn new(
        max_iter: u64,
        display: u64,
        eval_interval: u64,
        snapshot: u64,
        snapshot_prefix: impl Into<String>,
    ) -> Self {
        Self {
            max_iter,
            display,
            eval_interval,
            snapshot,
            snapshot_prefix: snapshot_prefix.into(),
        }
    }
}

/// One evaluation round's outcome.
#[derive(Debug, Clone)]
pub struct EvalResult {
    /// Training iteration the evaluation ran after.
    pub iter: u64,
    /// Mean evaluation loss.
    pub loss: f32,
    /// AUC over the evaluation batches, when both classes appeared.
    pub auc: Option<f32>,
}

/// What a `fit` run did.
#[derive(Debug, Clone, Default)]
pub struct FitReport {
    /// Iterations actually run (may be short of `max_iter` if the data
    /// ran out or a hook stopped training).
    pub iterations_run: u64,
    /// Loss of the final training iteration.
    pub final_loss: f32,
    /// All evaluation rounds.
    pub evals: Vec<EvalResult>,
    /// Dense snapshot files written, in order.
    pub snapshots: Vec<PathBuf>,
}

/// A CTR model assembled from a solver, reader parameters, an optimizer
/// configuration, and a JSON network graph.
pub struct Model {
    solver: Solver,
    reader_params: DataReaderParams,
    optimizer: OptimizerConfig,
    graph: Option<GraphConfig>,
    network: Option<DcnNetwork>,
    train_reader: Option<ParquetReader>,
    eval_reader: Option<ParquetReader>,
    hooks: HookList,
}

impl Model {
    /// Creates an empty model from its three configuration bundles.
    pub fn new(
        solver: Solver,
        reader_params: DataReaderParams,
        optimizer: OptimizerConfig,
    ) -> Self {
        Self {
            solver,
            reader_params,
            optimizer,
            graph: None,
            network: None,
            train_reader: None,
            eval_reader: None,
            hooks: HookList::new(),
        }
    }

    /// Registers an extra hook to run after every training iteration.
    pub fn add_hook(&mut self, hook: Box<dyn Hook>) {
        self.hooks.push(hook);
    }

    /// Loads the network graph from a JSON file and builds the network.
    ///
    /// With `include_dense_network` false only the embedding tables are
    /// built; such a model can be summarized but not fitted.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Graph`] if the file is missing, malformed,
    /// or inconsistent with the reader's slot-size array.
    pub fn construct_from_json(
        &mut self,
        path: impl AsRef<Path>,
        include_dense_network: bool,
    ) -> Result<()> {
        let graph = GraphConfig::from_file(path)?;
        let network = DcnNetwork::build(
            &graph,
            &self.reader_params.slot_size_array,
            &self.optimizer,
            include_dense_network,
        )?;
        info!(
            "constructed network with {} layers, {} parameters",
            graph.layers.len(),
            network.num_parameters()
        );
        self.graph = Some(graph);
        self.network = Some(network);
        Ok(())
    }

    /// Logs and returns a table of the constructed layers.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotConstructed`] before `construct_from_json`.
    pub fn summary(&self) -> Result<String> {
        let network = self.network.as_ref().ok_or(ModelError::NotConstructed)?;
        let devices = self.solver.device_map();
        let per_device = self.solver.batchsize_per_device();

        let mut table = format!(
            "devices: {} over {} nodes, batch per device {}, \
             mixed precision {}, cuda graph {}\n",
            devices.total_devices(),
            devices.num_nodes(),
            per_device,
            self.solver.use_mixed_precision,
            self.solver.use_cuda_graph
        );
        table.push_str(&format!(
            "{:<24} {:<24} {:>16} {:>14}\n",
            "name", "type", "output", "parameters"
        ));
        for row in network.summary() {
            table.push_str(&format!(
                "{:<24} {:<24} {:>16} {:>14}\n",
                row.name,
                row.layer_type,
                format!("({}, {})", per_device, row.output_dim),
                row.num_parameters
            ));
        }
        table.push_str(&format!("total parameters: {}\n", network.num_parameters()));

        for line in table.lines() {
            info!("{}", line);
        }
        Ok(table)
    }

    /// Opens the training and evaluation readers.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotConstructed`] before `construct_from_json`,
    /// or a [`ModelError::Data`] if a file list cannot be opened.
    pub fn compile(&mut self) -> Result<()> {
        let graph = self.graph.as_ref().ok_or(ModelError::NotConstructed)?;
        let (dense_dim, _) = graph.data_dims();

        self.train_reader = Some(ParquetReader::open(
            &self.reader_params,
            &self.reader_params.source,
            self.solver.batchsize,
            dense_dim,
            self.solver.repeat_dataset,
        )?);
        self.eval_reader = Some(ParquetReader::open(
            &self.reader_params,
            std::slice::from_ref(&self.reader_params.eval_source),
            self.solver.batchsize_eval,
            dense_dim,
            true,
        )?);
        info!(
            "compiled model: batchsize {}, batchsize_eval {}, {} devices",
            self.solver.batchsize,
            self.solver.batchsize_eval,
            self.solver.device_map().total_devices()
        );
        Ok(())
    }

    /// Runs the training loop.
    ///
    /// Every iteration pulls one batch, runs a train step, and drives the
    /// hooks. Every `eval_interval` iterations the model is evaluated on
    /// up to `max_eval_batches` evaluation batches; every `snapshot`
    /// iterations a snapshot is written under `snapshot_prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotCompiled`] before `compile`, or
    /// [`ModelError::MissingDenseNetwork`] if the dense half was skipped
    /// at construction.
    pub fn fit(&mut self, params: &FitParams) -> Result<FitReport> {
        if self.network.is_none() {
            return Err(ModelError::NotConstructed);
        }
        if self.train_reader.is_none() || self.eval_reader.is_none() {
            return Err(ModelError::NotCompiled);
        }
        if !self
            .network
            .as_ref()
            .expect("checked above")
            .has_dense_network()
        {
            return Err(ModelError::MissingDenseNetwork);
        }

        let mut hooks = std::mem::take(&mut self.hooks);
        let mut display = DisplayHook::new(params.display);
        let mut report = FitReport::default();

        info!(
            "fit: max_iter {}, display {}, eval_interval {}, snapshot {}",
            params.max_iter, params.display, params.eval_interval, params.snapshot
        );

        for iter in 0..params.max_iter {
            let batch = {
                let reader = self.train_reader.as_mut().expect("checked above");
                match reader.next_batch()? {
                    Some(batch) => batch,
                    None => {
                        warn!("training data exhausted after {} iterations", iter);
                        break;
                    }
                }
            };

            let network = self.network.as_mut().expect("checked above");
            let loss = network.train_step(&batch)?;
            report.iterations_run = iter + 1;
            report.final_loss = loss;

            let metrics = Metrics::new(loss, iter);
            display.after_step(iter, &metrics)?;
            if hooks.after_step(iter, &metrics)? == HookAction::Stop {
                info!("hook requested stop at iter {}", iter);
                break;
            }

            if params.eval_interval > 0 && (iter + 1) % params.eval_interval == 0 {
                let eval = self.evaluate(iter)?;
                report.evals.push(eval);
            }

            if params.snapshot > 0 && (iter + 1) % params.snapshot == 0 {
                let network = self.network.as_ref().expect("checked above");
                let paths = write_snapshot(&params.snapshot_prefix, iter + 1, network)?;
                report.snapshots.push(paths.dense);
            }
        }

        hooks.end(report.iterations_run)?;
        display.end(report.iterations_run)?;
        self.hooks = hooks;
        info!(
            "fit finished: {} iterations, final loss {:.6}",
            report.iterations_run, report.final_loss
        );
        Ok(report)
    }

    /// Runs up to `max_eval_batches` evaluation batches.
    fn evaluate(&mut self, iter: u64) -> Result<EvalResult> {
        let network = self.network.as_mut().expect("checked in fit");
        let reader = self.eval_reader.as_mut().expect("checked in fit");

        let mut losses = LossAverager::new();
        let mut all_labels = Vec::new();
        let mut all_scores = Vec::new();
        for _ in 0..self.solver.max_eval_batches {
            let Some(batch) = reader.next_batch()? else {
                break;
            };
            let (loss, scores) = network.evaluate(&batch)?;
            losses.record(loss);
            all_labels.extend_from_slice(&batch.labels);
            all_scores.extend(scores);
        }

        let result = EvalResult {
            iter,
            loss: losses.mean(),
            auc: auc(&all_labels, &all_scores),
        };
        match result.auc {
            Some(auc) => info!(
                "eval at iter {}: loss {:.6}, AUC {:.4} over {} batches",
                iter + 1,
                result.loss,
                auc,
                losses.count()
            ),
            None => info!(
                "eval at iter {}: loss {:.6} over {} batches",
                iter + 1,
                result.loss,
                losses.count()
            ),
        }
        Ok(result)
    }

    /// The solver configuration.
    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// The data reader parameters.
    pub fn reader_params(&self) -> &DataReaderParams {
        &self.reader_params
    }

    /// The optimizer configuration.
    pub fn optimizer(&self) -> &OptimizerConfig {
        &self.optimizer
    }
}
