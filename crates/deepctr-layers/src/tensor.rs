//! Row-major tensor type backing the layer computations.

use serde::{Deserialize, Serialize};

/// A dense multi-dimensional array of `f32` values in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a tensor of the given shape filled with zeros.
    pub fn zeros(shape: &[usize]) -> Self {
        let numel: usize = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            data: vec![0.0; numel],
        }
    }

    /// Creates a tensor of the given shape filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        let numel: usize = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            data: vec![1.0; numel],
        }
    }

    /// Creates a tensor from explicit data.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not match the product of `shape`.
    pub fn from_data(shape: &[usize], data: Vec<f32>) -> Self {
        let numel: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            numel,
            "data length {} does not match shape {:?}",
            data.len(),
            shape
        );
        Self {
            shape: shape.to_vec(),
            data,
        }
    }

    /// Creates a tensor drawn from a normal distribution.
    ///
    /// Uses a seeded LCG with a Box-Muller transform so initialization is
    /// reproducible across runs.
    pub fn randn(shape: &[usize], mean: f32, std: f32, seed: u64) -> Self {
        let numel: usize = shape.iter().product();
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        let mut next = move || {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            ((state >> 16) & 0x7fff) as f32 / 32768.0
        };
        let data: Vec<f32> = (0..numel)
            .map(|_| {
                let u1 = next() + 1e-10;
                let u2 = next();
                let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
                z * std + mean
            })
            .collect();
        Self {
            shape: shape.to_vec(),
            data,
        }
    }

    /// Creates a tensor drawn uniformly from `[-limit, limit)`.
    pub fn uniform(shape: &[usize], limit: f32, seed: u64) -> Self {
        let numel: usize = shape.iter().product();
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        let data: Vec<f32> = (0..numel)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                let u = ((state >> 16) & 0x7fff) as f32 / 32768.0;
                (2.0 * u - 1.0) * limit
            })
            .collect();
        Self {
            shape: shape.to_vec(),
            data,
        }
    }

    /// The shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// The underlying data slice.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// The underlying data slice, mutably.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// One row of a 2D tensor.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is not 2D or the row is out of range.
    pub fn row(&self, i: usize) -> &[f32] {
        assert_eq!(self.ndim(), 2, "row requires a 2D tensor");
        let n = self.shape[1];
        &self.data[i * n..(i + 1) * n]
    }

    /// Matrix product of two 2D tensors.
    ///
    /// # Panics
    ///
    /// Panics if either tensor is not 2D or the inner dimensions differ.
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.ndim(), 2, "matmul requires 2D tensors");
        assert_eq!(other.ndim(), 2, "matmul requires 2D tensors");
        assert_eq!(
            self.shape[1], other.shape[0],
            "inner dimensions must match"
        );

        let (m, k, n) = (self.shape[0], self.shape[1], other.shape[1]);
        let mut out = vec![0.0; m * n];
        for i in 0..m {
            for l in 0..k {
                let a = self.data[i * k + l];
                if a == 0.0 {
                    continue;
                }
                for j in 0..n {
                    out[i * n + j] += a * other.data[l * n + j];
                }
            }
        }
        Tensor::from_data(&[m, n], out)
    }

    /// Transpose of a 2D tensor.
    pub fn transpose(&self) -> Tensor {
        assert_eq!(self.ndim(), 2, "transpose requires a 2D tensor");
        let (m, n) = (self.shape[0], self.shape[1]);
        let mut out = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                out[j * m + i] = self.data[i * n + j];
            }
        }
        Tensor::from_data(&[n, m], out)
    }

    /// Element-wise addition, broadcasting a 1D bias across the rows of a
    /// 2D tensor when the shapes allow it.
    ///
    /// # Panics
    ///
    /// Panics if the shapes are incompatible.
    pub fn add(&self, other: &Tensor) -> Tensor {
        if self.shape == other.shape {
            let data = self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| a + b)
                .collect();
            Tensor::from_data(&self.shape, data)
        } else if self.ndim() == 2 && other.ndim() == 1 && self.shape[1] == other.shape[0] {
            let n = self.shape[1];
            let mut data = self.data.clone();
            for i in 0..self.shape[0] {
                for j in 0..n {
                    data[i * n + j] += other.data[j];
                }
            }
            Tensor::from_data(&self.shape, data)
        } else {
            panic!(
                "cannot broadcast shapes {:?} and {:?}",
                self.shape, other.shape
            );
        }
    }

    /// Element-wise subtraction of equally shaped tensors.
    pub fn sub(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.shape, other.shape, "sub requires equal shapes");
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a - b)
            .collect();
        Tensor::from_data(&self.shape, data)
    }

    /// Element-wise multiplication of equally shaped tensors.
    pub fn mul(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.shape, other.shape, "mul requires equal shapes");
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .collect();
        Tensor::from_data(&self.shape, data)
    }

    /// Scalar multiplication.
    pub fn scale(&self, scalar: f32) -> Tensor {
        let data = self.data.iter().map(|a| a * scalar).collect();
        Tensor::from_data(&self.shape, data)
    }

    /// Sum of all elements.
    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    /// Column sums of a 2D tensor, yielding a 1D tensor.
    pub fn sum_rows(&self) -> Tensor {
        assert_eq!(self.ndim(), 2, "sum_rows requires a 2D tensor");
        let n = self.shape[1];
        let mut out = vec![0.0; n];
        for i in 0..self.shape[0] {
            for j in 0..n {
                out[j] += self.data[i * n + j];
            }
        }
        Tensor::from_data(&[n], out)
    }

    /// Applies a function element-wise.
    pub fn map<F>(&self, f: F) -> Tensor
    where
        F: Fn(f32) -> f32,
    {
        let data = self.data.iter().map(|&x| f(x)).collect();
        Tensor::from_data(&self.shape, data)
    }

    /// Reinterprets the tensor with a new shape of the same element count.
    ///
    /// # Panics
    ///
    /// Panics if the element counts differ.
    pub fn reshape(&self, new_shape: &[usize]) -> Tensor {
        let new_numel: usize = new_shape.iter().product();
        assert_eq!(
            self.numel(),
            new_numel,
            "cannot reshape {} elements to {:?}",
            self.numel(),
            new_shape
        );
        Tensor::from_data(new_shape, self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let t = Tensor::from_data(&[2, 2], vec![1.0, -2.5, 0.0, 3.25]);
        let json = serde_json::to_string(&t).unwrap();
        let back: Tensor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.shape(), t.shape());
        assert_eq!(back.data(), t.data());
    }

    #[test]
    fn test_creation() {
        let t = Tensor::zeros(&[2, 3]);
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.numel(), 6);
        assert!(t.data().iter().all(|&x| x == 0.0));

        let t = Tensor::ones(&[3]);
        assert!(t.data().iter().all(|&x| x == 1.0));
    }

    #[test]
    fn test_matmul() {
        let a = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = Tensor::from_data(&[3, 2], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let c = a.matmul(&b);
        assert_eq!(c.shape(), &[2, 2]);
        assert_eq!(c.data(), &[22.0, 28.0, 49.0, 64.0]);
    }

    #[test]
    fn test_transpose() {
        let a = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = a.transpose();
        assert_eq!(b.shape(), &[3, 2]);
        assert_eq!(b.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_bias_broadcast() {
        let a = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = Tensor::from_data(&[3], vec![10.0, 20.0, 30.0]);
        let c = a.add(&b);
        assert_eq!(c.data(), &[11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);
    }

    #[test]
    fn test_sum_rows() {
        let a = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let s = a.sum_rows();
        assert_eq!(s.shape(), &[3]);
        assert_eq!(s.data(), &[5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_randn_reproducible() {
        let a = Tensor::randn(&[4, 4], 0.0, 1.0, 7);
        let b = Tensor::randn(&[4, 4], 0.0, 1.0, 7);
        assert_eq!(a, b);
        let c = Tensor::randn(&[4, 4], 0.0, 1.0, 8);
        assert_ne!(a, c);
    }

    #[test]
    fn test_uniform_within_limit() {
        let t = Tensor::uniform(&[100], 0.5, 3);
        assert!(t.data().iter().all(|&x| x >= -0.5 && x < 0.5));
    }

    #[test]
    fn test_reshape() {
        let a = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = a.reshape(&[3, 2]);
        assert_eq!(b.shape(), &[3, 2]);
        assert_eq!(b.data(), a.data());
    }

    #[test]
    fn test_row() {
        let a = Tensor::from_data(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(a.row(1), &[4.0, 5.0, 6.0]);
    }
}
