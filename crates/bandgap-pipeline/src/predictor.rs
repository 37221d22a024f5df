use bandgap_core::{Tensor, TensorError};
use bandgap_models::{Estimator, Model, ModelFamily, Task};
use bandgap_preprocessing::{StandardScaler, Transformer};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::error::PipelineResult;

/// A fitted model together with the scaler its inputs must pass through.
#[derive(Debug, Clone)]
pub struct ScaledModel {
    pub scaler: StandardScaler<f64>,
    pub model: Model,
}

impl ScaledModel {
    pub fn new(scaler: StandardScaler<f64>, model: Model) -> Self {
        ScaledModel { scaler, model }
    }

    pub fn n_features(&self) -> Option<usize> {
        self.scaler.n_features()
    }

    pub fn predict(&self, x: &Tensor<f64>) -> PipelineResult<Tensor<f64>> {
        let scaled = self.scaler.transform(x)?;
        Ok(self.model.predict(&scaled)?)
    }

    pub fn predict_proba(&self, x: &Tensor<f64>) -> PipelineResult<Tensor<f64>> {
        let scaled = self.scaler.transform(x)?;
        Ok(self.model.predict_proba(&scaled)?)
    }
}

/// Prediction for one material.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub is_semiconductor: bool,
    pub semiconductor_probability: f64,
    /// eV; 0 for non-semiconductors.
    pub band_gap: f64,
}

/// Serving-side view of one persisted artifact set.
#[derive(Debug, Clone)]
pub struct BandGapPredictor {
    pub family: ModelFamily,
    pub classifier: ScaledModel,
    pub regressor: ScaledModel,
}

impl BandGapPredictor {
    pub fn load(store: &dyn ArtifactStore, family: ModelFamily) -> PipelineResult<Self> {
        let load = |task| -> PipelineResult<ScaledModel> {
            Ok(ScaledModel::new(
                store.load_scaler(family, task)?,
                store.load_model(family, task)?,
            ))
        };
        let predictor = BandGapPredictor {
            family,
            classifier: load(Task::Classification)?,
            regressor: load(Task::Regression)?,
        };
        info!(family = %family, "loaded predictor");
        Ok(predictor)
    }

    /// Predict for each row of an already featurized matrix.
    pub fn predict(&self, features: &Tensor<f64>) -> PipelineResult<Vec<Prediction>> {
        let classes = self.classifier.predict(features)?;
        let proba = self.classifier.predict_proba(features)?;
        let gaps = self.regressor.predict(features)?;
        if classes.numel() != gaps.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![classes.numel()],
                got: vec![gaps.numel()],
            }
            .into());
        }

        Ok(classes
            .data()
            .iter()
            .zip(proba.data())
            .zip(gaps.data())
            .map(|((&c, &p), &g)| {
                let is_semiconductor = c >= 0.5;
                Prediction {
                    is_semiconductor,
                    semiconductor_probability: p,
                    band_gap: if is_semiconductor { g.max(0.0) } else { 0.0 },
                }
            })
            .collect())
    }
}
