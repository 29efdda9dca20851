//! Cross network layers for explicit feature interactions.
//!
//! Each cross level computes
//!
//! ```text
//! x_{l+1} = x_0 * (x_l . w) + b + x_l
//! ```
//!
//! where `x_0` is the network input, `x_l . w` is a per-sample scalar, and
//! the residual term keeps the original features flowing through. Stacking
//! `n` levels models feature interactions up to degree `n + 1`.

use crate::error::LayerError;
use crate::layer::Layer;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// One cross level with a vector weight and bias, both of width `d`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossLevel {
    weight: Tensor,
    bias: Tensor,
    weight_grad: Option<Tensor>,
    bias_grad: Option<Tensor>,
    dim: usize,
}

impl CrossLevel {
    /// Creates a cross level for feature width `dim`.
    pub fn new(dim: usize, seed: u64) -> Self {
        let std = 1.0 / (dim as f32).sqrt();
        Self {
            weight: Tensor::randn(&[dim], 0.0, std, seed),
            bias: Tensor::zeros(&[dim]),
            weight_grad: None,
            bias_grad: None,
            dim,
        }
    }

    /// Computes `x0 * (xl . w) + b + xl` for a batch.
    fn forward_with_x0(&self, x0: &Tensor, xl: &Tensor) -> Tensor {
        let batch = x0.shape()[0];
        let d = self.dim;
        let mut out = vec![0.0; batch * d];
        for i in 0..batch {
            let s: f32 = xl
                .row(i)
                .iter()
                .zip(self.weight.data())
                .map(|(x, w)| x * w)
                .sum();
            for j in 0..d {
                out[i * d + j] = x0.row(i)[j] * s + self.bias.data()[j] + xl.row(i)[j];
            }
        }
        Tensor::from_data(&[batch, d], out)
    }

    /// Backward for one level. Returns `(dL/dxl, dL/dx0 contribution)` and
    /// records the weight and bias gradients.
    fn backward_with_x0(&mut self, x0: &Tensor, xl: &Tensor, grad: &Tensor) -> (Tensor, Tensor) {
        let batch = x0.shape()[0];
        let d = self.dim;
        let mut w_grad = vec![0.0; d];
        let mut xl_grad = vec![0.0; batch * d];
        let mut x0_grad = vec![0.0; batch * d];

        for i in 0..batch {
            let s: f32 = xl
                .row(i)
                .iter()
                .zip(self.weight.data())
                .map(|(x, w)| x * w)
                .sum();
            // ds = g . x0 for this sample
            let ds: f32 = grad
                .row(i)
                .iter()
                .zip(x0.row(i))
                .map(|(g, x)| g * x)
                .sum();
            for j in 0..d {
                w_grad[j] += ds * xl.row(i)[j];
                xl_grad[i * d + j] = grad.row(i)[j] + ds * self.weight.data()[j];
                x0_grad[i * d + j] = grad.row(i)[j] * s;
            }
        }

        self.weight_grad = Some(Tensor::from_data(&[d], w_grad));
        self.bias_grad = Some(grad.sum_rows());
        (
            Tensor::from_data(&[batch, d], xl_grad),
            Tensor::from_data(&[batch, d], x0_grad),
        )
    }
}

/// A stack of [`CrossLevel`]s sharing the network input `x0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiCross {
    levels: Vec<CrossLevel>,
    /// Inputs to each level from the last forward pass; `cached[0]` is x0.
    cached: Vec<Tensor>,
    dim: usize,
}

impl MultiCross {
    /// Creates a cross network of `num_levels` levels over width `dim`.
    pub fn new(dim: usize, num_levels: usize, seed: u64) -> Self {
        let levels = (0..num_levels)
            .map(|l| CrossLevel::new(dim, seed.wrapping_add(l as u64)))
            .collect();
        Self {
            levels,
            cached: Vec::new(),
            dim,
        }
    }

    /// Number of cross levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }
}

impl Layer for MultiCross {
    fn forward(&mut self, input: &Tensor) -> Result<Tensor, LayerError> {
        if input.ndim() != 2 || input.shape()[1] != self.dim {
            return Err(LayerError::InvalidInputDimension {
                expected: self.dim,
                actual: *input.shape().last().unwrap_or(&0),
            });
        }

        self.cached.clear();
        self.cached.push(input.clone());
        let mut x = input.clone();
        for level in &self.levels {
            x = level.forward_with_x0(input, &x);
            self.cached.push(x.clone());
        }
        Ok(x)
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, LayerError> {
        if self.cached.len() != self.levels.len() + 1 {
            return Err(LayerError::NotInitialized);
        }
        let x0 = self.cached[0].clone();
        if grad.shape() != x0.shape() {
            return Err(LayerError::ShapeMismatch {
                expected: x0.shape().to_vec(),
                actual: grad.shape().to_vec(),
            });
        }

        let mut g = grad.clone();
        let mut x0_grad = Tensor::zeros(x0.shape());
        for (l, level) in self.levels.iter_mut().enumerate().rev() {
            let xl = &self.cached[l];
            let (xl_grad, x0_contrib) = level.backward_with_x0(&x0, xl, &g);
            x0_grad = x0_grad.add(&x0_contrib);
            g = xl_grad;
        }
        Ok(g.add(&x0_grad))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.levels
            .iter()
            .flat_map(|l| [&l.weight, &l.bias])
            .collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.levels
            .iter_mut()
            .flat_map(|l| [&mut l.weight, &mut l.bias])
            .collect()
    }

    fn gradients(&self) -> Vec<Tensor> {
        let mut grads = Vec::with_capacity(self.levels.len() * 2);
        for level in &self.levels {
            match (&level.weight_grad, &level.bias_grad) {
                (Some(w), Some(b)) => {
                    grads.push(w.clone());
                    grads.push(b.clone());
                }
                _ => return Vec::new(),
            }
        }
        grads
    }

    fn name(&self) -> &str {
        "MultiCross"
    }

    fn output_dim(&self, input_dim: usize) -> usize {
        input_dim
    }
}
