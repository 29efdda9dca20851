//! Slot-partitioned sparse embedding.

use crate::error::LayerError;
use crate::tensor::Tensor;
use deepctr_optimizer::{create_optimizer, OptimizerConfig, OptimizerDyn};

/// A sparse embedding with one table per categorical slot.
///
/// Slot `s` holds a `[slot_sizes[s], vec_size]` table. A batch supplies one
/// key per slot per sample; the looked-up vectors are concatenated across
/// slots, giving an output of width `slot_num * vec_size`. The backward
/// pass scatters output gradients into per-table gradient buffers, and
/// [`SlotEmbedding::apply_gradients`] feeds each table through its own
/// optimizer instance.
pub struct SlotEmbedding {
    tables: Vec<Tensor>,
    grads: Vec<Tensor>,
    optimizers: Vec<Box<dyn OptimizerDyn>>,
    cached_keys: Vec<Vec<i64>>,
    vec_size: usize,
    slot_sizes: Vec<u64>,
}

impl SlotEmbedding {
    /// Creates an embedding from the slot cardinalities and vector width.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] if there are no slots, a slot
    /// has zero cardinality, or `vec_size` is zero.
    pub fn new(
        slot_sizes: &[u64],
        vec_size: usize,
        optimizer: &OptimizerConfig,
    ) -> Result<Self, LayerError> {
        if slot_sizes.is_empty() {
            return Err(LayerError::ConfigError {
                message: "slot_size_array must not be empty".to_string(),
            });
        }
        if vec_size == 0 {
            return Err(LayerError::ConfigError {
                message: "embedding_vec_size must be positive".to_string(),
            });
        }
        if let Some(slot) = slot_sizes.iter().position(|&c| c == 0) {
            return Err(LayerError::ConfigError {
                message: format!("slot {} has zero cardinality", slot),
            });
        }

        let std = 1.0 / (vec_size as f32).sqrt();
        let tables = slot_sizes
            .iter()
            .enumerate()
            .map(|(s, &cardinality)| {
                Tensor::randn(&[cardinality as usize, vec_size], 0.0, std, s as u64 + 1)
            })
            .collect();
        let optimizers = slot_sizes
            .iter()
            .map(|_| create_optimizer(optimizer.clone()))
            .collect();

        Ok(Self {
            tables,
            grads: Vec::new(),
            optimizers,
            cached_keys: Vec::new(),
            vec_size,
            slot_sizes: slot_sizes.to_vec(),
        })
    }

    /// Number of categorical slots.
    pub fn slot_num(&self) -> usize {
        self.slot_sizes.len()
    }

    /// Width of one embedding vector.
    pub fn vec_size(&self) -> usize {
        self.vec_size
    }

    /// Output width for one sample, `slot_num * vec_size`.
    pub fn output_dim(&self) -> usize {
        self.slot_num() * self.vec_size
    }

    /// Total parameter count across all tables.
    pub fn num_parameters(&self) -> usize {
        self.tables.iter().map(Tensor::numel).sum()
    }

    /// The table for one slot.
    pub fn table(&self, slot: usize) -> &Tensor {
        &self.tables[slot]
    }

    /// Replaces the per-slot tables, for checkpoint restore.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ShapeMismatch`] if any table shape differs
    /// from the configured one.
    pub fn load_tables(&mut self, tables: Vec<Tensor>) -> Result<(), LayerError> {
        if tables.len() != self.tables.len() {
            return Err(LayerError::ConfigError {
                message: format!(
                    "expected {} tables, got {}",
                    self.tables.len(),
                    tables.len()
                ),
            });
        }
        for (slot, table) in tables.iter().enumerate() {
            if table.shape() != self.tables[slot].shape() {
                return Err(LayerError::ShapeMismatch {
                    expected: self.tables[slot].shape().to_vec(),
                    actual: table.shape().to_vec(),
                });
            }
        }
        self.tables = tables;
        Ok(())
    }

    /// All tables, for checkpoint save.
    pub fn tables(&self) -> &[Tensor] {
        &self.tables
    }

    /// Looks up and concatenates embedding vectors for a batch.
    ///
    /// `sparse` is indexed `sparse[slot][sample]`, as produced by the data
    /// reader. Returns `[batch, slot_num * vec_size]`.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::ConfigError`] if the slot count disagrees
    /// with the configuration or a key is outside its table.
    pub fn forward(&mut self, sparse: &[Vec<i64>]) -> Result<Tensor, LayerError> {
        if sparse.len() != self.slot_num() {
            return Err(LayerError::ConfigError {
                message: format!(
                    "batch has {} slots, embedding configured for {}",
                    sparse.len(),
                    self.slot_num()
                ),
            });
        }
        let batch = sparse.first().map_or(0, Vec::len);
        let width = self.output_dim();
        let mut out = vec![0.0; batch * width];

        for (slot, keys) in sparse.iter().enumerate() {
            let table = &self.tables[slot];
            for (i, &key) in keys.iter().enumerate() {
                if key < 0 || key as u64 >= self.slot_sizes[slot] {
                    return Err(LayerError::ConfigError {
                        message: format!(
                            "key {} out of range for slot {} (cardinality {})",
                            key, slot, self.slot_sizes[slot]
                        ),
                    });
                }
                let vector = table.row(key as usize);
                let offset = i * width + slot * self.vec_size;
                out[offset..offset + self.vec_size].copy_from_slice(vector);
            }
        }

        self.cached_keys = sparse.to_vec();
        Ok(Tensor::from_data(&[batch, width], out))
    }

    /// Scatters the output gradient into per-table gradient buffers.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::NotInitialized`] if no forward pass has run,
    /// or a shape error if `grad` does not match the last batch.
    pub fn backward(&mut self, grad: &Tensor) -> Result<(), LayerError> {
        if self.cached_keys.is_empty() {
            return Err(LayerError::NotInitialized);
        }
        let batch = self.cached_keys[0].len();
        let width = self.output_dim();
        if grad.shape() != [batch, width].as_slice() {
            return Err(LayerError::ShapeMismatch {
                expected: vec![batch, width],
                actual: grad.shape().to_vec(),
            });
        }

        if self.grads.len() != self.tables.len() {
            self.grads = self
                .tables
                .iter()
                .map(|t| Tensor::zeros(t.shape()))
                .collect();
        } else {
            for g in &mut self.grads {
                for v in g.data_mut() {
                    *v = 0.0;
                }
            }
        }

        for (slot, keys) in self.cached_keys.iter().enumerate() {
            let table_grad = self.grads[slot].data_mut();
            for (i, &key) in keys.iter().enumerate() {
                let src = i * width + slot * self.vec_size;
                let dst = key as usize * self.vec_size;
                for k in 0..self.vec_size {
                    table_grad[dst + k] += grad.data()[src + k];
                }
            }
        }
        Ok(())
    }

    /// Applies the accumulated gradients to every table.
    ///
    /// A no-op if backward has not run since the last update.
    pub fn apply_gradients(&mut self) {
        if self.grads.len() != self.tables.len() {
            return;
        }
        for ((table, grad), optimizer) in self
            .tables
            .iter_mut()
            .zip(self.grads.iter())
            .zip(self.optimizers.iter_mut())
        {
            optimizer.apply_gradients(table.data_mut(), grad.data());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding() -> SlotEmbedding {
        SlotEmbedding::new(&[10, 5], 4, &OptimizerConfig::adam()).unwrap()
    }

    #[test]
    fn test_output_shape() {
        let mut emb = embedding();
        let sparse = vec![vec![0, 3, 9], vec![1, 4, 2]];
        let out = emb.forward(&sparse).unwrap();
        assert_eq!(out.shape(), &[3, 8]);
    }

    #[test]
    fn test_lookup_concatenates_slot_vectors() {
        let mut emb = embedding();
        let sparse = vec![vec![2], vec![3]];
        let out = emb.forward(&sparse).unwrap();

        assert_eq!(&out.data()[..4], emb.table(0).row(2));
        assert_eq!(&out.data()[4..], emb.table(1).row(3));
    }

    #[test]
    fn test_key_out_of_range() {
        let mut emb = embedding();
        assert!(emb.forward(&[vec![10], vec![0]]).is_err());
        assert!(emb.forward(&[vec![-1], vec![0]]).is_err());
    }

    #[test]
    fn test_slot_count_mismatch() {
        let mut emb = embedding();
        assert!(emb.forward(&[vec![0]]).is_err());
    }

    #[test]
    fn test_backward_and_update_moves_touched_rows() {
        let mut emb = embedding();
        let before_touched = emb.table(0).row(2).to_vec();
        let before_untouched = emb.table(0).row(7).to_vec();

        let sparse = vec![vec![2], vec![3]];
        let out = emb.forward(&sparse).unwrap();
        let grad = Tensor::ones(out.shape());
        emb.backward(&grad).unwrap();
        emb.apply_gradients();

        assert_ne!(emb.table(0).row(2), &before_touched[..]);
        // Untouched rows see zero gradient and do not move under Adam.
        assert_eq!(emb.table(0).row(7), &before_untouched[..]);
    }

    #[test]
    fn test_repeated_key_accumulates() {
        let mut emb = embedding();
        let sparse = vec![vec![1, 1], vec![0, 0]];
        let out = emb.forward(&sparse).unwrap();
        emb.backward(&Tensor::ones(out.shape())).unwrap();

        // Both samples hit row 1 of slot 0, so its gradient is 2 per lane.
        let grad_row = &emb.grads[0].row(1).to_vec();
        assert!(grad_row.iter().all(|&g| (g - 2.0).abs() < 1e-6));
    }

    #[test]
    fn test_backward_before_forward() {
        let mut emb = embedding();
        assert!(emb.backward(&Tensor::ones(&[1, 8])).is_err());
    }

    #[test]
    fn test_invalid_config() {
        assert!(SlotEmbedding::new(&[], 4, &OptimizerConfig::adam()).is_err());
        assert!(SlotEmbedding::new(&[10], 0, &OptimizerConfig::adam()).is_err());
        assert!(SlotEmbedding::new(&[10, 0], 4, &OptimizerConfig::adam()).is_err());
    }

    #[test]
    fn test_num_parameters() {
        let emb = embedding();
        assert_eq!(emb.num_parameters(), 10 * 4 + 5 * 4);
    }
}
