pub mod classification;
pub mod regression;

pub use classification::*;
pub use regression::*;

use bandgap_core::{Float, Tensor, TensorError, TensorResult};

/// Both inputs must be non-empty and of equal length; returns that length.
pub(crate) fn check_pair<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>) -> TensorResult<usize> {
    let n = y_true.numel();
    if n == 0 {
        return Err(TensorError::EmptyTensor);
    }
    if y_pred.numel() != n {
        return Err(TensorError::ShapeMismatch {
            expected: vec![n],
            got: vec![y_pred.numel()],
        });
    }
    Ok(n)
}
