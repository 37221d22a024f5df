use crate::dtype::Float;
use crate::error::{TensorError, TensorResult};
use crate::shape::Shape;

use serde::{Deserialize, Serialize};

/// Dense row-major tensor.
///
/// The pipeline only ever needs feature matrices (`[rows, cols]`) and label
/// vectors (`[rows]`), so most helpers below are specialised to rank 1 and 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct Tensor<T: Float> {
    data: Vec<T>,
    shape: Shape,
}

// ─── Construction ───────────────────────────────────────────────────────────

impl<T: Float> Tensor<T> {
    /// Create a tensor from raw data and shape.
    pub fn new(data: Vec<T>, shape: Vec<usize>) -> TensorResult<Self> {
        let s = Shape::new(shape);
        if data.len() != s.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: s.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor { data, shape: s })
    }

    /// Create a tensor filled with zeros.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let s = Shape::new(shape);
        Tensor {
            data: vec![T::ZERO; s.numel()],
            shape: s,
        }
    }

    /// Create a 1-D tensor from a slice.
    pub fn from_slice(data: &[T]) -> Self {
        Tensor {
            data: data.to_vec(),
            shape: Shape::new(vec![data.len()]),
        }
    }

    /// Create a 2-D tensor from row vectors.
    pub fn from_vec2d(rows: &[Vec<T>]) -> TensorResult<Self> {
        if rows.is_empty() {
            return Ok(Tensor::zeros(vec![0, 0]));
        }
        let cols = rows[0].len();
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(TensorError::DimensionMismatch(format!(
                "all rows must have {} columns, found one with {}",
                cols,
                bad.len()
            )));
        }
        let flat: Vec<T> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::new(flat, vec![rows.len(), cols])
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_vec(&self) -> Vec<usize> {
        self.shape.to_vec()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Row count of a matrix, or length of a vector.
    pub fn nrows(&self) -> TensorResult<usize> {
        self.shape.dim(0)
    }

    /// Column count of a matrix.
    pub fn ncols(&self) -> TensorResult<usize> {
        Ok(self.shape.matrix_dims()?.1)
    }

    /// Multi-dimensional indexing.
    pub fn get(&self, indices: &[usize]) -> TensorResult<T> {
        if indices.len() != self.ndim() {
            return Err(TensorError::DimensionMismatch(format!(
                "Expected {} indices, got {}",
                self.ndim(),
                indices.len()
            )));
        }
        let mut offset = 0;
        let mut stride = 1;
        for (axis, &idx) in indices.iter().enumerate().rev() {
            let size = self.shape.dim(axis)?;
            if idx >= size {
                return Err(TensorError::IndexOutOfBounds {
                    index: idx,
                    axis,
                    size,
                });
            }
            offset += idx * stride;
            stride *= size;
        }
        Ok(self.data[offset])
    }

    /// Borrow one row of a matrix.
    pub fn row(&self, i: usize) -> TensorResult<&[T]> {
        let (rows, cols) = self.shape.matrix_dims()?;
        if i >= rows {
            return Err(TensorError::IndexOutOfBounds {
                index: i,
                axis: 0,
                size: rows,
            });
        }
        Ok(&self.data[i * cols..(i + 1) * cols])
    }

    /// Copy out a column of a matrix.
    pub fn col(&self, j: usize) -> TensorResult<Tensor<T>> {
        let (rows, cols) = self.shape.matrix_dims()?;
        if j >= cols {
            return Err(TensorError::IndexOutOfBounds {
                index: j,
                axis: 1,
                size: cols,
            });
        }
        let data: Vec<T> = (0..rows).map(|i| self.data[i * cols + j]).collect();
        Ok(Tensor::from_slice(&data))
    }

    // ─── Row selection ──────────────────────────────────────────────────────

    /// Gather rows (or vector entries) by index, in the given order.
    ///
    /// Works for both rank-1 and rank-2 tensors; duplicates are allowed,
    /// which is what bootstrap sampling relies on.
    pub fn select_rows(&self, indices: &[usize]) -> TensorResult<Tensor<T>> {
        let rows = self.nrows()?;
        let width = match self.ndim() {
            1 => 1,
            2 => self.shape.dim(1)?,
            n => {
                return Err(TensorError::InvalidOperation(format!(
                    "select_rows() expects rank 1 or 2, got rank {}",
                    n
                )))
            }
        };
        let mut data = Vec::with_capacity(indices.len() * width);
        for &i in indices {
            if i >= rows {
                return Err(TensorError::IndexOutOfBounds {
                    index: i,
                    axis: 0,
                    size: rows,
                });
            }
            data.extend_from_slice(&self.data[i * width..(i + 1) * width]);
        }
        let mut shape = self.shape_vec();
        shape[0] = indices.len();
        Tensor::new(data, shape)
    }

    /// Keep columns `start..end` of a matrix.
    pub fn slice_cols(&self, start: usize, end: usize) -> TensorResult<Tensor<T>> {
        let (rows, cols) = self.shape.matrix_dims()?;
        if start > end || end > cols {
            return Err(TensorError::IndexOutOfBounds {
                index: end,
                axis: 1,
                size: cols,
            });
        }
        let width = end - start;
        let mut data = Vec::with_capacity(rows * width);
        for i in 0..rows {
            data.extend_from_slice(&self.data[i * cols + start..i * cols + end]);
        }
        Tensor::new(data, vec![rows, width])
    }

    // ─── Element-wise ───────────────────────────────────────────────────────

    /// Apply a function to every element.
    pub fn apply<F: Fn(T) -> T>(&self, f: F) -> Tensor<T> {
        Tensor {
            data: self.data.iter().map(|&v| f(v)).collect(),
            shape: self.shape.clone(),
        }
    }

    /// Apply `f(value, column)` to every element of a matrix.
    pub fn map_columns<F: Fn(T, usize) -> T>(&self, f: F) -> TensorResult<Tensor<T>> {
        let (_, cols) = self.shape.matrix_dims()?;
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(k, &v)| f(v, k % cols.max(1)))
            .collect();
        Ok(Tensor {
            data,
            shape: self.shape.clone(),
        })
    }

    // ─── Reductions ─────────────────────────────────────────────────────────

    pub fn sum_all(&self) -> T {
        self.data.iter().copied().sum()
    }

    pub fn mean_all(&self) -> TensorResult<T> {
        if self.data.is_empty() {
            return Err(TensorError::EmptyTensor);
        }
        Ok(self.sum_all() / T::from_usize(self.data.len()))
    }

    /// Per-column mean of a matrix (reduction over axis 0).
    pub fn mean_axis0(&self) -> TensorResult<Tensor<T>> {
        let (rows, cols) = self.shape.matrix_dims()?;
        if rows == 0 {
            return Err(TensorError::EmptyTensor);
        }
        let mut sums = vec![T::ZERO; cols];
        for row in self.data.chunks(cols.max(1)) {
            for (acc, &v) in sums.iter_mut().zip(row) {
                *acc += v;
            }
        }
        let n = T::from_usize(rows);
        Ok(Tensor::from_slice(
            &sums.into_iter().map(|s| s / n).collect::<Vec<_>>(),
        ))
    }

    /// Per-column population variance of a matrix (divides by `n`).
    pub fn var_axis0(&self) -> TensorResult<Tensor<T>> {
        let mean = self.mean_axis0()?;
        let (rows, cols) = self.shape.matrix_dims()?;
        let mut acc = vec![T::ZERO; cols];
        for row in self.data.chunks(cols.max(1)) {
            for ((a, &v), &m) in acc.iter_mut().zip(row).zip(mean.data()) {
                let d = v - m;
                *a += d * d;
            }
        }
        let n = T::from_usize(rows);
        Ok(Tensor::from_slice(
            &acc.into_iter().map(|s| s / n).collect::<Vec<_>>(),
        ))
    }

    pub fn has_non_finite(&self) -> bool {
        self.data.iter().any(|v| !v.is_finite())
    }
}

impl<T: Float> std::fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tensor(shape={}, data=[", self.shape)?;
        for (i, v) in self.data.iter().take(8).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.4}", v)?;
        }
        if self.data.len() > 8 {
            write!(f, ", ...")?;
        }
        write!(f, "])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> Tensor<f64> {
        Tensor::from_vec2d(&[
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_new_rejects_bad_length() {
        let err = Tensor::<f64>::new(vec![1.0, 2.0, 3.0], vec![2, 2]).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_from_vec2d_ragged() {
        let res = Tensor::<f64>::from_vec2d(&[vec![1.0, 2.0], vec![3.0]]);
        assert!(res.is_err());
    }

    #[test]
    fn test_get_and_row() {
        let t = sample();
        assert_eq!(t.get(&[1, 2]).unwrap(), 6.0);
        assert_eq!(t.row(2).unwrap(), &[7.0, 8.0, 9.0]);
        assert!(t.row(3).is_err());
        assert_eq!(t.col(1).unwrap().data(), &[2.0, 5.0, 8.0]);
    }

    #[test]
    fn test_select_rows_matrix_and_vector() {
        let t = sample();
        let picked = t.select_rows(&[2, 0, 2]).unwrap();
        assert_eq!(picked.shape_vec(), vec![3, 3]);
        assert_eq!(picked.row(0).unwrap(), &[7.0, 8.0, 9.0]);
        assert_eq!(picked.row(1).unwrap(), &[1.0, 2.0, 3.0]);

        let v = Tensor::from_slice(&[10.0, 20.0, 30.0]);
        assert_eq!(v.select_rows(&[1, 1]).unwrap().data(), &[20.0, 20.0]);
        assert!(v.select_rows(&[3]).is_err());
    }

    #[test]
    fn test_slice_cols() {
        let t = sample();
        let s = t.slice_cols(1, 3).unwrap();
        assert_eq!(s.shape_vec(), vec![3, 2]);
        assert_eq!(s.data(), &[2.0, 3.0, 5.0, 6.0, 8.0, 9.0]);
        assert!(t.slice_cols(2, 4).is_err());
    }

    #[test]
    fn test_axis0_reductions() {
        let t = sample();
        let mean = t.mean_axis0().unwrap();
        assert_eq!(mean.data(), &[4.0, 5.0, 6.0]);
        let var = t.var_axis0().unwrap();
        for &v in var.data() {
            assert_abs_diff_eq!(v, 6.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_map_columns() {
        let t = sample();
        let shifted = t.map_columns(|v, j| v - j as f64).unwrap();
        assert_eq!(shifted.row(0).unwrap(), &[1.0, 1.0, 1.0]);
    }
}
