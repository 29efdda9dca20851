//! The network assembled from a graph configuration.
//!
//! [`DcnNetwork`] owns the embedding, the dense layer stack, the loss, and
//! one optimizer per parameter tensor. A training step is a forward pass
//! over one [`CtrBatch`], a loss evaluation, a full backward pass, and a
//! parameter update.

use deepctr_data::CtrBatch;
use deepctr_layers::{
    BinaryCrossEntropyLoss, InnerProduct, Layer, LayerError, MultiCross, Relu, SlotEmbedding,
    Tensor,
};
use deepctr_optimizer::{create_optimizer, OptimizerConfig, OptimizerDyn};
use tracing::debug;

use crate::graph::{GraphConfig, GraphError, LayerConfig};

/// One row of the model summary.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    /// Layer name from the graph file.
    pub name: String,
    /// Layer type tag.
    pub layer_type: String,
    /// Output width per sample.
    pub output_dim: usize,
    /// Learnable parameter count.
    pub num_parameters: usize,
}

/// A deep-and-cross network built from a [`GraphConfig`].
pub struct DcnNetwork {
    embedding: Option<SlotEmbedding>,
    embedding_name: String,
    dense_layers: Vec<Box<dyn Layer>>,
    dense_names: Vec<String>,
    optimizers: Vec<Vec<Box<dyn OptimizerDyn>>>,
    loss: BinaryCrossEntropyLoss,
    dense_dim: usize,
    /// Width of the tensor entering the dense stack.
    input_width: usize,
    /// Whether the dense features are part of the stack input.
    concat_dense: bool,
    include_dense_network: bool,
}

impl DcnNetwork {
    /// Builds a network from a validated graph.
    ///
    /// When `include_dense_network` is false only the embedding tables are
    /// constructed; such a network can be summarized and snapshotted but
    /// not trained.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Validation`] if the graph disagrees with the
    /// slot-size array or does not end in a one-wide logit.
    pub fn build(
        graph: &GraphConfig,
        slot_size_array: &[u64],
        optimizer: &OptimizerConfig,
        include_dense_network: bool,
    ) -> Result<Self, GraphError> {
        let invalid = |message: String| GraphError::Validation { message };
        let (dense_dim, slot_num) = graph.data_dims();
        let has_embedding = graph.embedding_vec_size().is_some();
        if has_embedding && slot_num != slot_size_array.len() {
            return Err(invalid(format!(
                "graph slot_num {} does not match slot_size_array length {}",
                slot_num,
                slot_size_array.len()
            )));
        }

        let mut embedding = None;
        let mut embedding_name = String::new();
        let mut dense_layers: Vec<Box<dyn Layer>> = Vec::new();
        let mut dense_names = Vec::new();
        let mut concat_dense = !has_embedding;
        let mut width = dense_dim;

        for (index, layer) in graph.layers.iter().enumerate() {
            let seed = index as u64 + 1;
            match layer {
                LayerConfig::Data { .. } | LayerConfig::BinaryCrossEntropyLoss { .. } => {}
                LayerConfig::SparseEmbedding {
                    name,
                    embedding_vec_size,
                } => {
                    let emb = SlotEmbedding::new(slot_size_array, *embedding_vec_size, optimizer)
                        .map_err(|e| invalid(e.to_string()))?;
                    // Until a Concat appears the embedding output alone
                    // feeds the dense stack.
                    width = emb.output_dim();
                    embedding_name = name.clone();
                    embedding = Some(emb);
                }
                LayerConfig::Concat { .. } => {
                    let emb_width = embedding
                        .as_ref()
                        .map(SlotEmbedding::output_dim)
                        .unwrap_or(0);
                    width = dense_dim + emb_width;
                    concat_dense = true;
                }
                LayerConfig::MultiCross { name, num_layers } if include_dense_network => {
                    dense_layers.push(Box::new(MultiCross::new(width, *num_layers, seed)));
                    dense_names.push(name.clone());
                }
                LayerConfig::InnerProduct { name, num_output } if include_dense_network => {
                    dense_layers.push(Box::new(InnerProduct::new(width, *num_output, seed)));
                    dense_names.push(name.clone());
                    width = *num_output;
                }
                LayerConfig::Relu { name } if include_dense_network => {
                    dense_layers.push(Box::new(Relu::new()));
                    dense_names.push(name.clone());
                }
                _ => {}
            }
        }

        if include_dense_network && width != 1 {
            return Err(invalid(format!(
                "network must end in a single logit, final width is {}",
                width
            )));
        }

        let input_width = if concat_dense {
            dense_dim
                + embedding
                    .as_ref()
                    .map(SlotEmbedding::output_dim)
                    .unwrap_or(0)
        } else {
            embedding
                .as_ref()
                .map(SlotEmbedding::output_dim)
                .unwrap_or(dense_dim)
        };

        let optimizers = dense_layers
            .iter()
            .map(|layer| {
                layer
                    .parameters()
                    .iter()
                    .map(|_| create_optimizer(optimizer.clone()))
                    .collect()
            })
            .collect();

        debug!(
            "built network: {} dense layers, input width {}, embedding: {}",
            dense_layers.len(),
            input_width,
            embedding.is_some()
        );

        Ok(Self {
            embedding,
            embedding_name,
            dense_layers,
            dense_names,
            optimizers,
            loss: BinaryCrossEntropyLoss::new(),
            dense_dim,
            input_width,
            concat_dense,
            include_dense_network,
        })
    }

    /// Whether the dense layer stack was constructed.
    pub fn has_dense_network(&self) -> bool {
        self.include_dense_network
    }

    /// Total learnable parameter count.
    pub fn num_parameters(&self) -> usize {
        let dense: usize = self
            .dense_layers
            .iter()
            .flat_map(|l| l.parameters())
            .map(Tensor::numel)
            .sum();
        dense
            + self
                .embedding
                .as_ref()
                .map(SlotEmbedding::num_parameters)
                .unwrap_or(0)
    }

    /// Builds the stack input for one batch: `[dense | embedding]` rows.
    fn assemble_input(&mut self, batch: &CtrBatch) -> Result<Tensor, LayerError> {
        if batch.dense_dim != self.dense_dim {
            return Err(LayerError::InvalidInputDimension {
                expected: self.dense_dim,
                actual: batch.dense_dim,
            });
        }

        let emb_out = match self.embedding.as_mut() {
            Some(emb) => Some(emb.forward(&batch.sparse)?),
            None => None,
        };

        let width = self.input_width;
        let mut data = vec![0.0f32; batch.batch_size * width];
        for i in 0..batch.batch_size {
            let mut offset = i * width;
            if self.concat_dense {
                data[offset..offset + self.dense_dim].copy_from_slice(batch.dense_row(i));
                offset += self.dense_dim;
            }
            if let Some(emb) = &emb_out {
                let row = emb.row(i);
                data[offset..offset + row.len()].copy_from_slice(row);
            }
        }
        Ok(Tensor::from_data(&[batch.batch_size, width], data))
    }

    /// Forward pass to logits.
    fn forward(&mut self, batch: &CtrBatch) -> Result<Tensor, LayerError> {
        let mut x = self.assemble_input(batch)?;
        for layer in &mut self.dense_layers {
            x = layer.forward(&x)?;
        }
        Ok(x)
    }

    /// Runs one training step and returns the batch loss.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError`] if the batch shape disagrees with the
    /// network.
    pub fn train_step(&mut self, batch: &CtrBatch) -> Result<f32, LayerError> {
        let logits = self.forward(batch)?;
        let loss_value = self.loss.forward(&logits, &batch.labels)?;

        let mut grad = self.loss.backward()?;
        for layer in self.dense_layers.iter_mut().rev() {
            grad = layer.backward(&grad)?;
        }

        if let Some(emb) = self.embedding.as_mut() {
            let emb_grad = if self.concat_dense {
                slice_columns(&grad, self.dense_dim)
            } else {
                grad
            };
            emb.backward(&emb_grad)?;
        }

        self.apply_gradients();
        Ok(loss_value)
    }

    /// Forward-only evaluation returning the batch loss and per-sample
    /// click probabilities.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError`] on a shape mismatch.
    pub fn evaluate(&mut self, batch: &CtrBatch) -> Result<(f32, Vec<f32>), LayerError> {
        let logits = self.forward(batch)?;
        let loss_value = self.loss.forward(&logits, &batch.labels)?;
        let scores = self
            .loss
            .probabilities()
            .ok_or(LayerError::NotInitialized)?;
        Ok((loss_value, scores))
    }

    fn apply_gradients(&mut self) {
        for (layer, opts) in self.dense_layers.iter_mut().zip(self.optimizers.iter_mut()) {
            let grads = layer.gradients();
            if grads.is_empty() {
                continue;
            }
            for ((param, grad), opt) in layer
                .parameters_mut()
                .into_iter()
                .zip(grads.iter())
                .zip(opts.iter_mut())
            {
                opt.apply_gradients(param.data_mut(), grad.data());
            }
        }
        if let Some(emb) = self.embedding.as_mut() {
            emb.apply_gradients();
        }
    }

    /// Summary rows for every constructed layer, input to output.
    pub fn summary(&self) -> Vec<SummaryRow> {
        let mut rows = Vec::new();
        if let Some(emb) = &self.embedding {
            rows.push(SummaryRow {
                name: self.embedding_name.clone(),
                layer_type: "SparseEmbedding".to_string(),
                output_dim: emb.output_dim(),
                num_parameters: emb.num_parameters(),
            });
        }
        let mut width = self.input_width;
        for (layer, name) in self.dense_layers.iter().zip(&self.dense_names) {
            width = layer.output_dim(width);
            rows.push(SummaryRow {
                name: name.clone(),
                layer_type: layer.name().to_string(),
                output_dim: width,
                num_parameters: layer.parameters().iter().map(|p| p.numel()).sum(),
            });
        }
        rows
    }

    /// The dense stack's parameters, in layer order.
    pub fn dense_parameters(&self) -> Vec<&Tensor> {
        self.dense_layers
            .iter()
            .flat_map(|l| l.parameters())
            .collect()
    }

    /// The embedding tables, if the network has an embedding.
    pub fn embedding_tables(&self) -> Option<&[Tensor]> {
        self.embedding.as_ref().map(SlotEmbedding::tables)
    }
}

/// Drops the first `skip` columns of a 2D tensor.
fn slice_columns(t: &Tensor, skip: usize) -> Tensor {
    let rows = t.shape()[0];
    let cols = t.shape()[1];
    let kept = cols - skip;
    let mut out = Vec::with_capacity(rows * kept);
    for i in 0..rows {
        out.extend_from_slice(&t.row(i)[skip..]);
    }
    Tensor::from_data(&[rows, kept], out)
}
