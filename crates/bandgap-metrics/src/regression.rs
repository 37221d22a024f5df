use bandgap_core::{Float, Tensor, TensorResult};
use serde::{Deserialize, Serialize};

use crate::check_pair;

fn pairs<'a, T: Float>(y_true: &'a Tensor<T>, y_pred: &'a Tensor<T>) -> impl Iterator<Item = (f64, f64)> + 'a {
    y_true
        .data()
        .iter()
        .zip(y_pred.data())
        .map(|(&t, &p)| (t.to_f64(), p.to_f64()))
}

/// Mean Squared Error.
pub fn mse<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>) -> TensorResult<f64> {
    let n = check_pair(y_true, y_pred)?;
    let sum: f64 = pairs(y_true, y_pred).map(|(t, p)| (t - p) * (t - p)).sum();
    Ok(sum / n as f64)
}

/// Root Mean Squared Error.
pub fn rmse<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>) -> TensorResult<f64> {
    Ok(mse(y_true, y_pred)?.sqrt())
}

/// Mean Absolute Error.
pub fn mae<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>) -> TensorResult<f64> {
    let n = check_pair(y_true, y_pred)?;
    let sum: f64 = pairs(y_true, y_pred).map(|(t, p)| (t - p).abs()).sum();
    Ok(sum / n as f64)
}

/// `1 - num / den`, where a zero denominator means a constant target:
/// 1 for an exact fit, 0 otherwise.
fn one_minus_ratio(num: f64, den: f64) -> f64 {
    if den < 1e-15 {
        if num < 1e-15 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - num / den
    }
}

/// R² (coefficient of determination).
pub fn r2_score<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>) -> TensorResult<f64> {
    let n = check_pair(y_true, y_pred)?;
    let mean_true = y_true.data().iter().map(|v| v.to_f64()).sum::<f64>() / n as f64;
    let ss_res: f64 = pairs(y_true, y_pred).map(|(t, p)| (t - p) * (t - p)).sum();
    let ss_tot: f64 = y_true
        .data()
        .iter()
        .map(|&t| {
            let d = t.to_f64() - mean_true;
            d * d
        })
        .sum();
    Ok(one_minus_ratio(ss_res, ss_tot))
}

/// Explained Variance Score.
///
/// EV = 1 - Var(y - ŷ) / Var(y)
pub fn explained_variance<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>) -> TensorResult<f64> {
    let n = check_pair(y_true, y_pred)? as f64;
    let residuals: Vec<f64> = pairs(y_true, y_pred).map(|(t, p)| t - p).collect();
    let res_mean = residuals.iter().sum::<f64>() / n;
    let var_res = residuals.iter().map(|&r| (r - res_mean) * (r - res_mean)).sum::<f64>() / n;

    let y_mean: f64 = y_true.data().iter().map(|v| v.to_f64()).sum::<f64>() / n;
    let var_y: f64 = y_true
        .data()
        .iter()
        .map(|v| {
            let d = v.to_f64() - y_mean;
            d * d
        })
        .sum::<f64>()
        / n;
    Ok(one_minus_ratio(var_res, var_y))
}

/// Held-out scores of the band gap regressor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub r2: f64,
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub explained_variance: f64,
}

impl RegressionMetrics {
    pub fn compute<T: Float>(y_true: &Tensor<T>, y_pred: &Tensor<T>) -> TensorResult<Self> {
        let mse = mse(y_true, y_pred)?;
        Ok(RegressionMetrics {
            r2: r2_score(y_true, y_pred)?,
            mae: mae(y_true, y_pred)?,
            mse,
            rmse: mse.sqrt(),
            explained_variance: explained_variance(y_true, y_pred)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mse() {
        let y_true: Tensor<f64> = Tensor::from_slice(&[1.0, 2.0, 3.0]);
        let y_pred: Tensor<f64> = Tensor::from_slice(&[1.0, 2.0, 3.0]);
        assert!(mse(&y_true, &y_pred).unwrap().abs() < 1e-10);
    }

    #[test]
    fn test_r2_perfect() {
        let y_true: Tensor<f64> = Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let y_pred: Tensor<f64> = Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert_abs_diff_eq!(r2_score(&y_true, &y_pred).unwrap(), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_mae() {
        let y_true: Tensor<f64> = Tensor::from_slice(&[1.0, 2.0, 3.0]);
        let y_pred: Tensor<f64> = Tensor::from_slice(&[1.5, 2.5, 3.5]);
        assert_abs_diff_eq!(mae(&y_true, &y_pred).unwrap(), 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_constant_target() {
        let y_true: Tensor<f64> = Tensor::from_slice(&[2.0, 2.0, 2.0]);
        let exact: Tensor<f64> = Tensor::from_slice(&[2.0, 2.0, 2.0]);
        let off: Tensor<f64> = Tensor::from_slice(&[2.0, 2.5, 2.0]);
        assert_eq!(r2_score(&y_true, &exact).unwrap(), 1.0);
        assert_eq!(r2_score(&y_true, &off).unwrap(), 0.0);
    }

    #[test]
    fn test_explained_variance_ignores_bias() {
        // A constant offset leaves the residual variance at zero.
        let y_true: Tensor<f64> = Tensor::from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let y_pred: Tensor<f64> = Tensor::from_slice(&[2.0, 3.0, 4.0, 5.0]);
        assert_abs_diff_eq!(explained_variance(&y_true, &y_pred).unwrap(), 1.0, epsilon = 1e-12);
        assert!(r2_score(&y_true, &y_pred).unwrap() < 1.0);
    }

    #[test]
    fn test_regression_metrics_sanity() {
        let y_true: Tensor<f64> = Tensor::from_slice(&[0.0, 1.2, 3.4, 0.0, 2.2]);
        let y_pred: Tensor<f64> = Tensor::from_slice(&[0.3, 1.0, 2.9, 0.5, 2.0]);
        let m = RegressionMetrics::compute(&y_true, &y_pred).unwrap();
        assert!(m.r2 <= 1.0);
        assert_abs_diff_eq!(m.rmse, m.mse.sqrt(), epsilon = 1e-15);
        assert!(m.mae >= 0.0);
    }

    #[test]
    fn test_length_mismatch() {
        let y_true: Tensor<f64> = Tensor::from_slice(&[1.0, 2.0]);
        let y_pred: Tensor<f64> = Tensor::from_slice(&[1.0]);
        assert!(RegressionMetrics::compute(&y_true, &y_pred).is_err());
    }
}
