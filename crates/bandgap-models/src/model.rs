use bandgap_core::Tensor;
use bandgap_tree::{
    GradientBoostingClassifier, GradientBoostingRegressor, RandomForestClassifier,
    RandomForestRegressor, XGBClassifier, XGBRegressor,
};
use serde::{Deserialize, Serialize};

use crate::error::ModelResult;
use crate::estimator::Estimator;
use crate::family::{ModelFamily, Task};
use crate::params::{ParamSet, ParamValue};

/// Every estimator the registry can build. This is the persisted form of a
/// trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Model {
    RandomForestClassifier(RandomForestClassifier<f64>),
    RandomForestRegressor(RandomForestRegressor<f64>),
    GradientBoostingClassifier(GradientBoostingClassifier<f64>),
    GradientBoostingRegressor(GradientBoostingRegressor<f64>),
    XGBClassifier(XGBClassifier<f64>),
    XGBRegressor(XGBRegressor<f64>),
}

macro_rules! dispatch {
    ($model:expr, $m:ident => $body:expr) => {
        match $model {
            Model::RandomForestClassifier($m) => $body,
            Model::RandomForestRegressor($m) => $body,
            Model::GradientBoostingClassifier($m) => $body,
            Model::GradientBoostingRegressor($m) => $body,
            Model::XGBClassifier($m) => $body,
            Model::XGBRegressor($m) => $body,
        }
    };
}

impl Model {
    pub fn family(&self) -> ModelFamily {
        match self {
            Model::RandomForestClassifier(_) | Model::RandomForestRegressor(_) => {
                ModelFamily::RandomForest
            }
            Model::GradientBoostingClassifier(_) | Model::GradientBoostingRegressor(_) => {
                ModelFamily::GradientBoosting
            }
            Model::XGBClassifier(_) | Model::XGBRegressor(_) => ModelFamily::XGBoost,
        }
    }
}

impl Estimator for Model {
    fn name(&self) -> &'static str {
        dispatch!(self, m => Estimator::name(m))
    }

    fn task(&self) -> Task {
        dispatch!(self, m => Estimator::task(m))
    }

    fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> ModelResult<()> {
        dispatch!(self, m => Estimator::fit(m, x, y))
    }

    fn is_fitted(&self) -> bool {
        dispatch!(self, m => Estimator::is_fitted(m))
    }

    fn predict(&self, x: &Tensor<f64>) -> ModelResult<Tensor<f64>> {
        dispatch!(self, m => Estimator::predict(m, x))
    }

    fn predict_proba(&self, x: &Tensor<f64>) -> ModelResult<Tensor<f64>> {
        dispatch!(self, m => Estimator::predict_proba(m, x))
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> ModelResult<()> {
        dispatch!(self, m => Estimator::set_param(m, name, value))
    }

    fn params(&self) -> ParamSet {
        dispatch!(self, m => Estimator::params(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::resolve;

    #[test]
    fn test_serde_roundtrip_preserves_predictions() {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i as f64 * 0.37).sin(), (i as f64 * 0.11).cos()])
            .collect();
        let x = Tensor::from_vec2d(&rows).unwrap();
        let y = Tensor::from_slice(&(0..40).map(|i| (i as f64 * 0.37).sin() * 3.0).collect::<Vec<_>>());

        let mut model = resolve(ModelFamily::GradientBoosting, Task::Regression)();
        model.set_param("n_estimators", ParamValue::Int(20)).unwrap();
        model.fit(&x, &y).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let back: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(back.family(), ModelFamily::GradientBoosting);
        assert_eq!(back.predict(&x).unwrap(), model.predict(&x).unwrap());
    }
}
