//! Static `(family, task) -> constructor` table and the default search
//! spaces used when no override is given.

use bandgap_tree::{
    BoosterParams, GradientBoostingClassifier, GradientBoostingRegressor, RandomForestClassifier,
    RandomForestRegressor, XGBClassifier, XGBRegressor,
};

use crate::family::{ModelFamily, Task};
use crate::model::Model;
use crate::params::{HyperparameterSpace, ParamValue};

/// Builds an unfitted estimator with library-default hyperparameters.
pub type EstimatorConstructor = fn() -> Model;

fn rf_classifier() -> Model {
    Model::RandomForestClassifier(RandomForestClassifier::new(100, None))
}

fn rf_regressor() -> Model {
    Model::RandomForestRegressor(RandomForestRegressor::new(100, None))
}

fn gb_classifier() -> Model {
    Model::GradientBoostingClassifier(GradientBoostingClassifier::new(100, 0.1, 3))
}

fn gb_regressor() -> Model {
    Model::GradientBoostingRegressor(GradientBoostingRegressor::new(100, 0.1, 3))
}

fn xgb_classifier() -> Model {
    Model::XGBClassifier(XGBClassifier::new(BoosterParams::default()))
}

fn xgb_regressor() -> Model {
    Model::XGBRegressor(XGBRegressor::new(BoosterParams::default()))
}

/// Constructor for `family` on `task`. The table is total over both enums.
pub fn resolve(family: ModelFamily, task: Task) -> EstimatorConstructor {
    match (family, task) {
        (ModelFamily::RandomForest, Task::Classification) => rf_classifier,
        (ModelFamily::RandomForest, Task::Regression) => rf_regressor,
        (ModelFamily::GradientBoosting, Task::Classification) => gb_classifier,
        (ModelFamily::GradientBoosting, Task::Regression) => gb_regressor,
        (ModelFamily::XGBoost, Task::Classification) => xgb_classifier,
        (ModelFamily::XGBoost, Task::Regression) => xgb_regressor,
    }
}

/// All registered `(family, task)` pairs.
pub fn entries() -> impl Iterator<Item = (ModelFamily, Task)> {
    ModelFamily::ALL
        .into_iter()
        .flat_map(|f| Task::ALL.into_iter().map(move |t| (f, t)))
}

fn ints(values: &[i64]) -> Vec<ParamValue> {
    values.iter().map(|&v| ParamValue::Int(v)).collect()
}

fn floats(values: &[f64]) -> Vec<ParamValue> {
    values.iter().map(|&v| ParamValue::Float(v)).collect()
}

/// Search space used when the caller does not supply one. Identical for
/// both tasks of a family.
pub fn default_search_space(family: ModelFamily, _task: Task) -> HyperparameterSpace {
    let space = HyperparameterSpace::new().with("n_estimators", ints(&[100, 200, 300]));
    match family {
        ModelFamily::RandomForest => space
            .with("max_depth", ints(&[10, 20, 30, 40]))
            .with("min_samples_split", ints(&[2, 5, 10]))
            .with("min_samples_leaf", ints(&[1, 2, 4])),
        ModelFamily::GradientBoosting => space
            .with("learning_rate", floats(&[0.01, 0.1, 0.2]))
            .with("max_depth", ints(&[3, 4, 5]))
            .with("min_samples_split", ints(&[2, 5, 10])),
        ModelFamily::XGBoost => space
            .with("learning_rate", floats(&[0.01, 0.1, 0.2]))
            .with("max_depth", ints(&[3, 4, 5]))
            .with("min_child_weight", ints(&[1, 3, 5])),
    }
}
