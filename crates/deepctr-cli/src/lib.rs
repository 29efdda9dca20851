//! Command-line driver for DCN training.
//!
//! The binary reproduces a multi-node training launch: each launcher-managed
//! process reads its rank from the environment, builds the fixed DCN
//! configuration over the Criteo slot layout, constructs the network from a
//! JSON graph file, and runs the fit loop inside a worker thread named
//! after the rank.
//!
//! ```bash
//! deepctr dcn_parquet.json
//! ```

#![warn(missing_docs)]

use std::path::PathBuf;
use std::thread;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use deepctr_core::comm;
use deepctr_core::{Solver, SolverBuilder};
use deepctr_data::DataReaderParams;
use deepctr_optimizer::OptimizerConfig;
use deepctr_training::{run_in_train_thread, FitParams, FitReport, Model};

/// Slot cardinalities of the Criteo terabyte dataset, one per categorical
/// feature.
pub const CRITEO_SLOT_SIZES: [u64; 26] = [
    381808, 22456, 14763, 7118, 19308, 4, 6443, 1259, 54, 341642, 112151, 94957, 11, 2188, 8399,
    61, 4, 949, 15, 382633, 246818, 370704, 92823, 9773, 78, 34,
];

/// File list consumed for both training and evaluation.
pub const FILE_LIST: &str = "./_file_list.txt";

/// Train a DCN model from a JSON network graph.
#[derive(Parser, Debug)]
#[command(name = "deepctr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the network graph JSON file.
    pub graph_config: PathBuf,
}

/// The fixed eight-GPU, four-node solver used by the DCN run.
///
/// # Errors
///
/// Construction is over literal values, but the builder still validates
/// them.
pub fn dcn_solver() -> deepctr_core::Result<Solver> {
    SolverBuilder::new()
        .max_eval_batches(100)
        .batchsize(16384)
        .batchsize_eval(16384)
        .vvgpu(vec![vec![0, 1], vec![2, 3], vec![4, 5], vec![6, 7]])
        .i64_input_key(true)
        .use_mixed_precision(false)
        .repeat_dataset(true)
        .use_cuda_graph(true)
        .build()
}

/// Parquet reader parameters over the Criteo slot layout.
pub fn dcn_reader_params() -> DataReaderParams {
    DataReaderParams::parquet(vec![FILE_LIST.to_string()], FILE_LIST.to_string())
        .with_slot_size_array(CRITEO_SLOT_SIZES.to_vec())
}

/// The fixed fit schedule of the DCN run.
pub fn dcn_fit_params() -> FitParams {
    FitParams::new(10000, 200, 1000, 100000, "dcn")
}

fn thread_label() -> String {
    thread::current().name().unwrap_or("main").to_string()
}

/// Runs the full training session for this process's rank.
///
/// # Errors
///
/// Propagates configuration, data, and training errors, and reports a
/// worker-thread panic as an error.
pub fn run(cli: Cli) -> Result<()> {
    comm::register_main_thread();
    let rank = comm::rank() as usize;

    info!("{} is main thread: {}", thread_label(), comm::is_main_thread());
    info!("before: rank {}", rank);

    let graph = cli.graph_config;
    let report = run_in_train_thread(rank, move || -> Result<FitReport> {
        info!("{} is main thread: {}", thread_label(), comm::is_main_thread());
        let solver = dcn_solver()?;
        let mut model = Model::new(solver, dcn_reader_params(), OptimizerConfig::adam());
        model.construct_from_json(&graph, true)?;
        model.summary()?;
        model.compile()?;
        Ok(model.fit(&dcn_fit_params())?)
    })??;

    info!(
        "after: rank {} ({} iterations, final loss {:.6})",
        rank, report.iterations_run, report.final_loss
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_graph_argument() {
        let err = Cli::try_parse_from(["deepctr"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_parses_graph_path() {
        let cli = Cli::try_parse_from(["deepctr", "dcn_parquet.json"]).unwrap();
        assert_eq!(cli.graph_config, PathBuf::from("dcn_parquet.json"));
    }

    #[test]
    fn test_rejects_extra_arguments() {
        assert!(Cli::try_parse_from(["deepctr", "a.json", "b.json"]).is_err());
    }

    #[test]
    fn test_solver_literals() {
        let solver = dcn_solver().unwrap();
        assert_eq!(solver.batchsize, 16384);
        assert_eq!(solver.batchsize_eval, 16384);
        assert_eq!(solver.max_eval_batches, 100);
        assert_eq!(solver.device_map().num_nodes(), 4);
        assert_eq!(solver.device_map().total_devices(), 8);
        assert_eq!(solver.batchsize_per_device(), 2048);
        assert!(solver.i64_input_key);
        assert!(!solver.use_mixed_precision);
        assert!(solver.repeat_dataset);
        assert!(solver.use_cuda_graph);
    }

    #[test]
    fn test_reader_literals() {
        let params = dcn_reader_params();
        assert_eq!(params.source, vec![FILE_LIST.to_string()]);
        assert_eq!(params.eval_source, FILE_LIST);
        assert_eq!(params.slot_num(), 26);
        let expected: u64 = CRITEO_SLOT_SIZES.iter().sum();
        assert_eq!(params.total_vocabulary(), expected);
    }

    #[test]
    fn test_thread_label() {
        let name = thread::Builder::new()
            .name("[rank-0 train]".to_string())
            .spawn(thread_label)
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(name, "[rank-0 train]");

        let unnamed = thread::spawn(thread_label).join().unwrap();
        assert_eq!(unnamed, "main");
    }

    #[test]
    fn test_fit_schedule_literals() {
        let params = dcn_fit_params();
        assert_eq!(params.max_iter, 10000);
        assert_eq!(params.display, 200);
        assert_eq!(params.eval_interval, 1000);
        assert_eq!(params.snapshot, 100000);
        assert_eq!(params.snapshot_prefix, "dcn");
    }
}
