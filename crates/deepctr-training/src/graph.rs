//! Network graph configuration loaded from JSON.
//!
//! A graph file lists the layers of the model from input to loss:
//!
//! ```json
//! {
//!   "layers": [
//!     {"name": "data", "type": "Data", "dense_dim": 13, "slot_num": 26},
//!     {"name": "sparse_embedding1", "type": "SparseEmbedding", "embedding_vec_size": 16},
//!     {"name": "concat1", "type": "Concat"},
//!     {"name": "multicross1", "type": "MultiCross", "num_layers": 6},
//!     {"name": "fc1", "type": "InnerProduct", "num_output": 1},
//!     {"name": "loss", "type": "BinaryCrossEntropyLoss"}
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a graph file.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph file could not be read.
    #[error("Failed to read graph file: {0}")]
    Io(#[from] std::io::Error),

    /// The graph file is not valid JSON or names an unknown layer type.
    #[error("Failed to parse graph file: {0}")]
    Json(#[from] serde_json::Error),

    /// The layer sequence does not form a valid network.
    #[error("Invalid graph: {message}")]
    Validation {
        /// What rule the graph broke.
        message: String,
    },
}

fn default_label_dim() -> usize {
    1
}

/// One layer entry in the graph file, tagged by its `type` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LayerConfig {
    /// The input layer describing the batch layout.
    Data {
        /// Layer name.
        #[serde(default)]
        name: String,
        /// Number of continuous features per sample.
        dense_dim: usize,
        /// Number of categorical slots per sample.
        slot_num: usize,
        /// Label width, fixed to 1 for binary CTR.
        #[serde(default = "default_label_dim")]
        label_dim: usize,
    },

    /// Sparse embedding over the categorical slots.
    SparseEmbedding {
        /// Layer name.
        #[serde(default)]
        name: String,
        /// Width of one embedding vector.
        embedding_vec_size: usize,
    },

    /// Concatenation of the dense features and the embedding output.
    Concat {
        /// Layer name.
        #[serde(default)]
        name: String,
    },

    /// A stack of cross levels.
    MultiCross {
        /// Layer name.
        #[serde(default)]
        name: String,
        /// Number of cross levels.
        num_layers: usize,
    },

    /// Fully connected layer.
    InnerProduct {
        /// Layer name.
        #[serde(default)]
        name: String,
        /// Output feature width.
        num_output: usize,
    },

    /// ReLU activation.
    #[serde(rename = "ReLU")]
    Relu {
        /// Layer name.
        #[serde(default)]
        name: String,
    },

    /// Binary cross entropy over logits; must be the last layer.
    BinaryCrossEntropyLoss {
        /// Layer name.
        #[serde(default)]
        name: String,
    },
}

impl LayerConfig {
    /// The layer name from the graph file.
    pub fn name(&self) -> &str {
        match self {
            LayerConfig::Data { name, .. }
            | LayerConfig::SparseEmbedding { name, .. }
            | LayerConfig::Concat { name, .. }
            | LayerConfig::MultiCross { name, .. }
            | LayerConfig::InnerProduct { name, .. }
            | LayerConfig::Relu { name, .. }
            | LayerConfig::BinaryCrossEntropyLoss { name, .. } => name,
        }
    }

    /// The type tag, as written in the graph file.
    pub fn type_name(&self) -> &'static str {
        match self {
            LayerConfig::Data { .. } => "Data",
            LayerConfig::SparseEmbedding { .. } => "SparseEmbedding",
            LayerConfig::Concat { .. } => "Concat",
            LayerConfig::MultiCross { .. } => "MultiCross",
            LayerConfig::InnerProduct { .. } => "InnerProduct",
            LayerConfig::Relu { .. } => "ReLU",
            LayerConfig::BinaryCrossEntropyLoss { .. } => "BinaryCrossEntropyLoss",
        }
    }
}

/// A parsed and validated graph file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Layers from input to loss.
    pub layers: Vec<LayerConfig>,
}

impl GraphConfig {
    /// Loads and validates a graph from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses and validates a graph from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] on parse or validation failure.
    pub fn from_json(text: &str) -> Result<Self, GraphError> {
        let graph: GraphConfig = serde_json::from_str(text)?;
        graph.validate()?;
        Ok(graph)
    }

    fn validate(&self) -> Result<(), GraphError> {
        let invalid = |message: String| GraphError::Validation { message };

        let first = self
            .layers
            .first()
            .ok_or_else(|| invalid("graph has no layers".to_string()))?;
        let LayerConfig::Data { label_dim, .. } = first else {
            return Err(invalid(format!(
                "first layer must be Data, got {}",
                first.type_name()
            )));
        };
        if *label_dim != 1 {
            return Err(invalid(format!(
                "label_dim must be 1 for binary CTR, got {}",
                label_dim
            )));
        }

        let last = self.layers.last().expect("checked non-empty");
        if !matches!(last, LayerConfig::BinaryCrossEntropyLoss { .. }) {
            return Err(invalid(format!(
                "last layer must be BinaryCrossEntropyLoss, got {}",
                last.type_name()
            )));
        }

        let mut embeddings = 0;
        let mut concats = 0;
        for (i, layer) in self.layers.iter().enumerate() {
            match layer {
                LayerConfig::Data { .. } if i != 0 => {
                    return Err(invalid("Data layer must come first".to_string()));
                }
                LayerConfig::BinaryCrossEntropyLoss { .. } if i != self.layers.len() - 1 => {
                    return Err(invalid("loss layer must come last".to_string()));
                }
                LayerConfig::SparseEmbedding {
                    embedding_vec_size, ..
                } => {
                    embeddings += 1;
                    if embeddings > 1 {
                        return Err(invalid(
                            "graph supports at most one SparseEmbedding".to_string(),
                        ));
                    }
                    if concats > 0 {
                        return Err(invalid(
                            "SparseEmbedding must come before Concat".to_string(),
                        ));
                    }
                    if *embedding_vec_size == 0 {
                        return Err(invalid("embedding_vec_size must be positive".to_string()));
                    }
                }
                LayerConfig::Concat { .. } => {
                    concats += 1;
                    if concats > 1 {
                        return Err(invalid("graph supports at most one Concat".to_string()));
                    }
                    if embeddings == 0 {
                        return Err(invalid(
                            "Concat requires a preceding SparseEmbedding".to_string(),
                        ));
                    }
                }
                LayerConfig::MultiCross { num_layers, .. } => {
                    if *num_layers == 0 {
                        return Err(invalid("MultiCross needs at least one level".to_string()));
                    }
                }
                LayerConfig::InnerProduct { num_output, .. } => {
                    if *num_output == 0 {
                        return Err(invalid("num_output must be positive".to_string()));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// The `(dense_dim, slot_num)` pair from the Data layer.
    pub fn data_dims(&self) -> (usize, usize) {
        match &self.layers[0] {
            LayerConfig::Data {
                dense_dim,
                slot_num,
                ..
            } => (*dense_dim, *slot_num),
            _ => unreachable!("validated graphs start with Data"),
        }
    }

    /// The embedding vector width, if the graph has a SparseEmbedding.
    pub fn embedding_vec_size(&self) -> Option<usize> {
        self.layers.iter().find_map(|l| match l {
            LayerConfig::SparseEmbedding {
                embedding_vec_size, ..
            } => Some(*embedding_vec_size),
            _ => None,
        })
    }
}
