//! Model snapshots.
//!
//! A snapshot at iteration `n` with prefix `p` writes three files next to
//! each other: `p_dense_n.model` with the dense stack's parameters,
//! `p_sparse_n.model` with the embedding tables, and `p.latest` recording
//! `n`. Both `.model` files are JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use deepctr_layers::Tensor;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::network::DcnNetwork;

/// Errors raised while writing or reading snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A snapshot file could not be written or read.
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot file is not valid JSON.
    #[error("Snapshot serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The dense half of a snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct DenseSnapshot {
    /// Iteration the snapshot was taken at.
    pub iter: u64,
    /// Parameter tensors of the dense stack, in layer order.
    pub parameters: Vec<Tensor>,
}

/// The sparse half of a snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct SparseSnapshot {
    /// Iteration the snapshot was taken at.
    pub iter: u64,
    /// One embedding table per slot.
    pub tables: Vec<Tensor>,
}

/// Paths written by one snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotPaths {
    /// The dense parameter file.
    pub dense: PathBuf,
    /// The embedding table file.
    pub sparse: PathBuf,
    /// The marker file naming the latest snapshot iteration.
    pub latest: PathBuf,
}

/// Writes a snapshot of `network` at iteration `iter` under `prefix`.
///
/// # Errors
///
/// Returns [`SnapshotError`] if any of the three files cannot be written.
pub fn write_snapshot(
    prefix: &str,
    iter: u64,
    network: &DcnNetwork,
) -> Result<SnapshotPaths, SnapshotError> {
    let paths = SnapshotPaths {
        dense: PathBuf::from(format!("{prefix}_dense_{iter}.model")),
        sparse: PathBuf::from(format!("{prefix}_sparse_{iter}.model")),
        latest: PathBuf::from(format!("{prefix}.latest")),
    };

    let dense = DenseSnapshot {
        iter,
        parameters: network.dense_parameters().into_iter().cloned().collect(),
    };
    let file = BufWriter::new(File::create(&paths.dense)?);
    serde_json::to_writer(file, &dense)?;

    let sparse = SparseSnapshot {
        iter,
        tables: network
            .embedding_tables()
            .map(|t| t.to_vec())
            .unwrap_or_default(),
    };
    let file = BufWriter::new(File::create(&paths.sparse)?);
    serde_json::to_writer(file, &sparse)?;

    let mut latest = File::create(&paths.latest)?;
    writeln!(latest, "{iter}")?;

    info!(
        "wrote snapshot at iter {}: {} and {}",
        iter,
        paths.dense.display(),
        paths.sparse.display()
    );
    Ok(paths)
}

/// Reads back the dense half of a snapshot.
///
/// # Errors
///
/// Returns [`SnapshotError`] if the file is missing or malformed.
pub fn read_dense_snapshot(path: &PathBuf) -> Result<DenseSnapshot, SnapshotError> {
    let file = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(file)?)
}

/// Reads back the sparse half of a snapshot.
///
/// # Errors
///
/// Returns [`SnapshotError`] if the file is missing or malformed.
pub fn read_sparse_snapshot(path: &PathBuf) -> Result<SparseSnapshot, SnapshotError> {
    let file = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(file)?)
}
