//! Solver configuration for a training session.
//!
//! The solver is an immutable bundle of session-level knobs: batch sizes,
//! the GPU-to-node mapping (`vvgpu`), key width, precision and CUDA-graph
//! flags, and the evaluation batch budget. It is assembled once through
//! [`SolverBuilder`] and consumed by the model constructor; nothing in it
//! touches the filesystem.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Device topology derived from a solver's `vvgpu` mapping.
///
/// `vvgpu` is a list of nodes, each holding the GPU ids used on that node.
/// The map answers topology questions the training loop and `summary` need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMap {
    vvgpu: Vec<Vec<usize>>,
}

impl DeviceMap {
    /// Builds a device map, validating the node/GPU layout.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDeviceMap`] if the mapping is empty, a
    /// node has no GPUs, or a GPU id repeats within one node.
    pub fn new(vvgpu: Vec<Vec<usize>>) -> Result<Self> {
        if vvgpu.is_empty() {
            return Err(CoreError::InvalidDeviceMap {
                message: "vvgpu must list at least one node".to_string(),
            });
        }
        for (node, gpus) in vvgpu.iter().enumerate() {
            if gpus.is_empty() {
                return Err(CoreError::InvalidDeviceMap {
                    message: format!("node {node} has no GPUs"),
                });
            }
            let mut seen = gpus.clone();
            seen.sort_unstable();
            seen.dedup();
            if seen.len() != gpus.len() {
                return Err(CoreError::InvalidDeviceMap {
                    message: format!("node {node} lists a duplicate GPU id"),
                });
            }
        }
        Ok(Self { vvgpu })
    }

    /// Number of nodes in the job.
    pub fn num_nodes(&self) -> usize {
        self.vvgpu.len()
    }

    /// Total number of devices across all nodes.
    pub fn total_devices(&self) -> usize {
        self.vvgpu.iter().map(Vec::len).sum()
    }

    /// GPU ids for one node, or `None` if the node index is out of range.
    pub fn node_devices(&self, node: usize) -> Option<&[usize]> {
        self.vvgpu.get(node).map(Vec::as_slice)
    }

    /// Resolves a global device index to `(node, gpu_id)`.
    pub fn device(&self, global: usize) -> Option<(usize, usize)> {
        let mut offset = 0;
        for (node, gpus) in self.vvgpu.iter().enumerate() {
            if global < offset + gpus.len() {
                return Some((node, gpus[global - offset]));
            }
            offset += gpus.len();
        }
        None
    }
}

/// Immutable training-session configuration.
///
/// Built once via [`SolverBuilder`] and handed to the model constructor.
/// The precision and CUDA-graph flags are carried for configuration parity
/// and reported by the model summary; execution on GPU devices is delegated
/// to the compute backend and outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solver {
    /// Number of batches consumed per evaluation pass.
    pub max_eval_batches: usize,
    /// Global training batch size.
    pub batchsize: usize,
    /// Global evaluation batch size.
    pub batchsize_eval: usize,
    /// GPU ids per node.
    pub vvgpu: Vec<Vec<usize>>,
    /// Whether categorical keys are 64-bit.
    pub i64_input_key: bool,
    /// Whether mixed-precision arithmetic was requested.
    pub use_mixed_precision: bool,
    /// Whether the dataset repeats when exhausted.
    pub repeat_dataset: bool,
    /// Whether CUDA-graph capture was requested.
    pub use_cuda_graph: bool,
}

impl Solver {
    /// Returns the device topology derived from `vvgpu`.
    ///
    /// Builder-made solvers carry a validated mapping; the map is returned
    /// as-is either way.
    pub fn device_map(&self) -> DeviceMap {
        DeviceMap {
            vvgpu: self.vvgpu.clone(),
        }
    }

    /// Per-device slice of the training batch.
    ///
    /// The fields are public and the type deserializes, so a solver with an
    /// empty `vvgpu` can exist without going through the builder; such a
    /// solver is treated as single-device.
    pub fn batchsize_per_device(&self) -> usize {
        self.batchsize / self.device_map().total_devices().max(1)
    }
}

/// Builder for [`Solver`].
///
/// # Example
///
/// ```
/// use deepctr_core::SolverBuilder;
///
/// let solver = SolverBuilder::new()
///     .max_eval_batches(100)
///     .batchsize(16384)
///     .batchsize_eval(16384)
///     .vvgpu(vec![vec![0, 1], vec![2, 3], vec![4, 5], vec![6, 7]])
///     .i64_input_key(true)
///     .repeat_dataset(true)
///     .use_cuda_graph(true)
///     .build()
///     .unwrap();
/// assert_eq!(solver.batchsize_per_device(), 2048);
/// ```
#[derive(Debug, Clone)]
pub struct SolverBuilder {
    max_eval_batches: usize,
    batchsize: usize,
    batchsize_eval: usize,
    vvgpu: Vec<Vec<usize>>,
    i64_input_key: bool,
    use_mixed_precision: bool,
    repeat_dataset: bool,
    use_cuda_graph: bool,
}

impl Default for SolverBuilder {
    fn default() -> Self {
        Self {
            max_eval_batches: 100,
            batchsize: 2048,
            batchsize_eval: 2048,
            vvgpu: vec![vec![0]],
            i64_input_key: false,
            use_mixed_precision: false,
            repeat_dataset: true,
            use_cuda_graph: false,
        }
    }
}

impl SolverBuilder {
    /// Creates a builder with single-node, single-GPU defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of batches per evaluation pass.
    pub fn max_eval_batches(mut self, n: usize) -> Self {
        self.max_eval_batches = n;
        self
    }

    /// Sets the global training batch size.
    pub fn batchsize(mut self, n: usize) -> Self {
        self.batchsize = n;
        self
    }

    /// Sets the global evaluation batch size.
    pub fn batchsize_eval(mut self, n: usize) -> Self {
        self.batchsize_eval = n;
        self
    }

    /// Sets the GPU-to-node mapping.
    pub fn vvgpu(mut self, vvgpu: Vec<Vec<usize>>) -> Self {
        self.vvgpu = vvgpu;
        self
    }

    /// Selects 64-bit categorical keys.
    pub fn i64_input_key(mut self, on: bool) -> Self {
        self.i64_input_key = on;
        self
    }

    /// Requests mixed-precision arithmetic.
    pub fn use_mixed_precision(mut self, on: bool) -> Self {
        self.use_mixed_precision = on;
        self
    }

    /// Repeats the dataset when exhausted.
    pub fn repeat_dataset(mut self, on: bool) -> Self {
        self.repeat_dataset = on;
        self
    }

    /// Requests CUDA-graph capture.
    pub fn use_cuda_graph(mut self, on: bool) -> Self {
        self.use_cuda_graph = on;
        self
    }

    /// Validates the configuration and produces a [`Solver`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidBatchSize`] for zero batch sizes or a
    /// training batch size not divisible by the device count, and
    /// [`CoreError::InvalidDeviceMap`] for a malformed `vvgpu` mapping.
    pub fn build(self) -> Result<Solver> {
        let device_map = DeviceMap::new(self.vvgpu.clone())?;

        if self.batchsize == 0 {
            return Err(CoreError::InvalidBatchSize {
                batchsize: 0,
                reason: "training batch size must be non-zero".to_string(),
            });
        }
        if self.batchsize_eval == 0 {
            return Err(CoreError::InvalidBatchSize {
                batchsize: 0,
                reason: "evaluation batch size must be non-zero".to_string(),
            });
        }
        let devices = device_map.total_devices();
        if self.batchsize % devices != 0 {
            return Err(CoreError::InvalidBatchSize {
                batchsize: self.batchsize,
                reason: format!("not divisible by {devices} devices"),
            });
        }

        Ok(Solver {
            max_eval_batches: self.max_eval_batches,
            batchsize: self.batchsize,
            batchsize_eval: self.batchsize_eval,
            vvgpu: self.vvgpu,
            i64_input_key: self.i64_input_key,
            use_mixed_precision: self.use_mixed_precision,
            repeat_dataset: self.repeat_dataset,
            use_cuda_graph: self.use_cuda_graph,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_defaults() {
        let solver = SolverBuilder::new().build().unwrap();
        assert_eq!(solver.max_eval_batches, 100);
        assert_eq!(solver.device_map().total_devices(), 1);
        assert!(!solver.use_mixed_precision);
    }

    #[test]
    fn test_multi_node_topology() {
        let solver = SolverBuilder::new()
            .batchsize(16384)
            .vvgpu(vec![vec![0, 1], vec![2, 3], vec![4, 5], vec![6, 7]])
            .build()
            .unwrap();

        let map = solver.device_map();
        assert_eq!(map.num_nodes(), 4);
        assert_eq!(map.total_devices(), 8);
        assert_eq!(map.node_devices(2), Some(&[4, 5][..]));
        assert_eq!(map.device(0), Some((0, 0)));
        assert_eq!(map.device(3), Some((1, 3)));
        assert_eq!(map.device(7), Some((3, 7)));
        assert_eq!(map.device(8), None);
        assert_eq!(solver.batchsize_per_device(), 2048);
    }

    #[test]
    fn test_rejects_zero_batchsize() {
        let err = SolverBuilder::new().batchsize(0).build().unwrap_err();
        assert!(matches!(err, CoreError::InvalidBatchSize { .. }));
    }

    #[test]
    fn test_rejects_indivisible_batchsize() {
        let err = SolverBuilder::new()
            .batchsize(100)
            .vvgpu(vec![vec![0, 1, 2]])
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidBatchSize { batchsize: 100, .. }
        ));
    }

    #[test]
    fn test_rejects_empty_node() {
        let err = SolverBuilder::new()
            .vvgpu(vec![vec![0], vec![]])
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDeviceMap { .. }));
    }

    #[test]
    fn test_rejects_duplicate_gpu_within_node() {
        let err = SolverBuilder::new()
            .vvgpu(vec![vec![0, 0]])
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDeviceMap { .. }));
    }

    #[test]
    fn test_deserialized_empty_vvgpu_does_not_panic() {
        // A hand-written config can bypass the builder's validation.
        let solver: Solver = serde_json::from_str(
            r#"{
                "max_eval_batches": 10,
                "batchsize": 512,
                "batchsize_eval": 512,
                "vvgpu": [],
                "i64_input_key": false,
                "use_mixed_precision": false,
                "repeat_dataset": true,
                "use_cuda_graph": false
            }"#,
        )
        .unwrap();
        assert_eq!(solver.device_map().total_devices(), 0);
        assert_eq!(solver.batchsize_per_device(), 512);
    }

    #[test]
    fn test_solver_serialization_round_trip() {
        let solver = SolverBuilder::new()
            .batchsize(4096)
            .vvgpu(vec![vec![0, 1]])
            .i64_input_key(true)
            .build()
            .unwrap();

        let json = serde_json::to_string(&solver).unwrap();
        let back: Solver = serde_json::from_str(&json).unwrap();
        assert_eq!(back.batchsize, 4096);
        assert!(back.i64_input_key);
    }
}
