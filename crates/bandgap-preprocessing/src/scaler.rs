use bandgap_core::{Float, Tensor, TensorError, TensorResult};
use serde::{Deserialize, Serialize};

/// Unsupervised feature transform fitted on one matrix and applied to others.
pub trait Transformer<T: Float> {
    fn fit(&mut self, x: &Tensor<T>) -> TensorResult<()>;
    fn transform(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>>;
    fn fit_transform(&mut self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Standardize features by removing the mean and scaling to unit variance.
///
/// Stores the population variance alongside the effective scale so a reloaded
/// scaler can be compared against a freshly fitted one. Constant features keep
/// a scale of one and therefore map to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct StandardScaler<T: Float> {
    pub mean: Option<Tensor<T>>,
    pub var: Option<Tensor<T>>,
    pub scale: Option<Tensor<T>>,
    pub n_samples_seen: usize,
}

impl<T: Float> StandardScaler<T> {
    pub fn new() -> Self {
        StandardScaler {
            mean: None,
            var: None,
            scale: None,
            n_samples_seen: 0,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some() && self.scale.is_some()
    }

    /// Number of features seen during `fit`, if fitted.
    pub fn n_features(&self) -> Option<usize> {
        self.mean.as_ref().map(|m| m.numel())
    }

    fn fitted(&self) -> TensorResult<(&Tensor<T>, &Tensor<T>)> {
        match (&self.mean, &self.scale) {
            (Some(mean), Some(scale)) => Ok((mean, scale)),
            _ => Err(TensorError::InvalidOperation(
                "StandardScaler must be fitted before transform".into(),
            )),
        }
    }

    /// Undo the scaling.
    pub fn inverse_transform(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let (mean, scale) = self.fitted()?;
        self.check_width(x, mean.numel())?;
        x.map_columns(|v, j| v * scale.data()[j] + mean.data()[j])
    }

    fn check_width(&self, x: &Tensor<T>, expected: usize) -> TensorResult<()> {
        let cols = x.ncols()?;
        if cols != expected {
            return Err(TensorError::DimensionMismatch(format!(
                "scaler was fitted on {} features, got {}",
                expected, cols
            )));
        }
        Ok(())
    }
}

impl<T: Float> Default for StandardScaler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> Transformer<T> for StandardScaler<T> {
    /// Compute mean and variance from training data (2D: [samples, features]).
    fn fit(&mut self, x: &Tensor<T>) -> TensorResult<()> {
        let mean = x.mean_axis0()?;
        let var = x.var_axis0()?;
        let scale = var.apply(|v| {
            let s = v.sqrt();
            if s < T::EPSILON {
                T::ONE
            } else {
                s
            }
        });
        self.n_samples_seen = x.nrows()?;
        self.mean = Some(mean);
        self.var = Some(var);
        self.scale = Some(scale);
        Ok(())
    }

    fn transform(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let (mean, scale) = self.fitted()?;
        self.check_width(x, mean.numel())?;
        x.map_columns(|v, j| (v - mean.data()[j]) / scale.data()[j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn data() -> Tensor<f64> {
        Tensor::from_vec2d(&[
            vec![1.0, 2.0, 5.0],
            vec![3.0, 4.0, 5.0],
            vec![5.0, 6.0, 5.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_standard_scaler_centers_and_scales() {
        let mut scaler = StandardScaler::new();
        let transformed = scaler.fit_transform(&data()).unwrap();

        let mean = transformed.mean_axis0().unwrap();
        let var = transformed.var_axis0().unwrap();
        for j in 0..2 {
            assert_abs_diff_eq!(mean.data()[j], 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(var.data()[j], 1.0, epsilon = 1e-12);
        }
        // constant column maps to zero rather than NaN
        assert_eq!(transformed.col(2).unwrap().data(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_transform_before_fit_is_error() {
        let scaler = StandardScaler::<f64>::new();
        assert!(scaler.transform(&data()).is_err());
    }

    #[test]
    fn test_width_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&data()).unwrap();
        let narrow = Tensor::from_vec2d(&[vec![1.0, 2.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&narrow),
            Err(TensorError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_inverse_transform() {
        let mut scaler = StandardScaler::new();
        let x = data();
        let z = scaler.fit_transform(&x).unwrap();
        let back = scaler.inverse_transform(&z).unwrap();
        for (a, b) in back.data().iter().zip(x.data()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
    }
}
