use bandgap_core::{Float, Tensor, TensorResult};
use serde::{Deserialize, Serialize};

use crate::check_pair;

/// Label of the positive ("semiconductor") class.
pub const POSITIVE_CLASS: usize = 1;

fn class_of<T: Float>(v: T) -> usize {
    v.to_f64().round().max(0.0) as usize
}

/// Compute accuracy: fraction of correct predictions.
pub fn accuracy<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>) -> TensorResult<f64> {
    let n = check_pair(y_true, y_pred)?;
    let correct = y_true
        .data()
        .iter()
        .zip(y_pred.data())
        .filter(|&(a, b)| class_of(*a) == class_of(*b))
        .count();
    Ok(correct as f64 / n as f64)
}

/// Confusion matrix, `matrix[true][pred]`.
pub fn confusion_matrix<T: Float>(
    y_true: &Tensor<T>,
    y_pred: &Tensor<T>,
    n_classes: usize,
) -> TensorResult<Vec<Vec<usize>>> {
    check_pair(y_true, y_pred)?;
    let mut matrix = vec![vec![0usize; n_classes]; n_classes];
    for (&t, &p) in y_true.data().iter().zip(y_pred.data()) {
        let (ti, pi) = (class_of(t), class_of(p));
        if ti < n_classes && pi < n_classes {
            matrix[ti][pi] += 1;
        }
    }
    Ok(matrix)
}

/// `(tp, fp, fn)` counts for one class.
fn counts<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>, class: usize) -> TensorResult<(usize, usize, usize)> {
    check_pair(y_true, y_pred)?;
    let (mut tp, mut fp, mut fn_) = (0, 0, 0);
    for (&t, &p) in y_true.data().iter().zip(y_pred.data()) {
        match (class_of(t) == class, class_of(p) == class) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    Ok((tp, fp, fn_))
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Precision for a specific class; 0 when nothing was predicted as `class`.
pub fn precision_class<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>, class: usize) -> TensorResult<f64> {
    let (tp, fp, _) = counts(y_true, y_pred, class)?;
    Ok(ratio(tp, tp + fp))
}

/// Recall for a specific class; 0 when `class` never occurs in `y_true`.
pub fn recall_class<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>, class: usize) -> TensorResult<f64> {
    let (tp, _, fn_) = counts(y_true, y_pred, class)?;
    Ok(ratio(tp, tp + fn_))
}

/// F1 score for a specific class.
pub fn f1_score_class<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>, class: usize) -> TensorResult<f64> {
    let p = precision_class(y_true, y_pred, class)?;
    let r = recall_class(y_true, y_pred, class)?;
    Ok(if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) })
}

/// Held-out scores of the semiconductor classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ClassificationMetrics {
    /// Binary metrics with class 1 as the positive class.
    pub fn compute<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>) -> TensorResult<Self> {
        Ok(ClassificationMetrics {
            accuracy: accuracy(y_true, y_pred)?,
            precision: precision_class(y_true, y_pred, POSITIVE_CLASS)?,
            recall: recall_class(y_true, y_pred, POSITIVE_CLASS)?,
            f1: f1_score_class(y_true, y_pred, POSITIVE_CLASS)?,
        })
    }
}
