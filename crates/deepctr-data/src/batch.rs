//! Minibatch container for CTR training data.

use crate::{DataError, Result};

/// One fixed-shape minibatch.
///
/// Layout:
/// - `labels`: one f32 label per sample.
/// - `dense`: row-major `[batch_size, dense_dim]` continuous features.
/// - `sparse`: `slot_num` vectors of `batch_size` categorical keys each,
///   indexed `sparse[slot][sample]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CtrBatch {
    /// Labels, one per sample.
    pub labels: Vec<f32>,
    /// Row-major dense features, `batch_size * dense_dim` values.
    pub dense: Vec<f32>,
    /// Categorical keys per slot, each of length `batch_size`.
    pub sparse: Vec<Vec<i64>>,
    /// Number of samples.
    pub batch_size: usize,
    /// Number of dense features per sample.
    pub dense_dim: usize,
}

impl CtrBatch {
    /// Builds a batch, validating the shapes against each other.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::SlotConfig`] if any component disagrees on the
    /// batch size or the dense width.
    pub fn new(
        labels: Vec<f32>,
        dense: Vec<f32>,
        sparse: Vec<Vec<i64>>,
        dense_dim: usize,
    ) -> Result<Self> {
        let batch_size = labels.len();
        if dense.len() != batch_size * dense_dim {
            return Err(DataError::SlotConfig(format!(
                "dense has {} values, expected {} ({} samples x {} features)",
                dense.len(),
                batch_size * dense_dim,
                batch_size,
                dense_dim
            )));
        }
        for (slot, keys) in sparse.iter().enumerate() {
            if keys.len() != batch_size {
                return Err(DataError::SlotConfig(format!(
                    "slot {} has {} keys, expected {}",
                    slot,
                    keys.len(),
                    batch_size
                )));
            }
        }
        Ok(Self {
            labels,
            dense,
            sparse,
            batch_size,
            dense_dim,
        })
    }

    /// Number of categorical slots.
    pub fn slot_num(&self) -> usize {
        self.sparse.len()
    }

    /// The dense feature row for one sample.
    pub fn dense_row(&self, sample: usize) -> &[f32] {
        let start = sample * self.dense_dim;
        &self.dense[start..start + self.dense_dim]
    }
}
