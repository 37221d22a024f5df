use bandgap_core::Tensor;
use bandgap_metrics::{accuracy, r2_score};
use bandgap_tree::{
    BoosterParams, GradientBoostingClassifier, GradientBoostingRegressor, RandomForestClassifier,
    RandomForestRegressor, TreeParams, XGBClassifier, XGBRegressor,
};

use crate::error::{ModelError, ModelResult};
use crate::family::Task;
use crate::params::{ParamSet, ParamValue};

/// Uniform interface over every trainable model in the registry.
///
/// All estimators work on `f64` feature matrices `[rows, features]` and
/// label vectors `[rows]`.
pub trait Estimator: Send + Sync {
    /// Type name used in error messages.
    fn name(&self) -> &'static str;

    fn task(&self) -> Task;

    fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> ModelResult<()>;

    fn is_fitted(&self) -> bool;

    fn predict(&self, x: &Tensor<f64>) -> ModelResult<Tensor<f64>>;

    /// Probability of class 1 for each row. Classifiers only.
    fn predict_proba(&self, _x: &Tensor<f64>) -> ModelResult<Tensor<f64>> {
        Err(ModelError::NoProbabilities(self.name()))
    }

    /// Set one hyperparameter. Unknown names and out-of-range values are
    /// rejected without touching the estimator.
    fn set_param(&mut self, name: &str, value: ParamValue) -> ModelResult<()>;

    /// Current values of every hyperparameter accepted by [`Estimator::set_param`].
    fn params(&self) -> ParamSet;

    fn set_params(&mut self, params: &ParamSet) -> ModelResult<()> {
        for (name, value) in params.iter() {
            self.set_param(name, *value)?;
        }
        Ok(())
    }

    /// Accuracy for classifiers, R² for regressors.
    fn score(&self, x: &Tensor<f64>, y: &Tensor<f64>) -> ModelResult<f64> {
        let pred = self.predict(x)?;
        let s = match self.task() {
            Task::Classification => accuracy(y, &pred)?,
            Task::Regression => r2_score(y, &pred)?,
        };
        Ok(s)
    }
}

// ─── Parameter coercion ─────────────────────────────────────────────────────

fn invalid(estimator: &'static str, name: &str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidParameter {
        estimator,
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn count(est: &'static str, name: &str, v: ParamValue, min: usize) -> ModelResult<usize> {
    match v.as_usize() {
        Some(n) if n >= min => Ok(n),
        _ => Err(invalid(est, name, format!("expected an integer >= {}, got {}", min, v))),
    }
}

fn seed(est: &'static str, name: &str, v: ParamValue) -> ModelResult<u64> {
    Ok(count(est, name, v, 0)? as u64)
}

fn real(est: &'static str, name: &str, v: ParamValue, ok: impl Fn(f64) -> bool, range: &str) -> ModelResult<f64> {
    match v.as_f64() {
        Some(f) if ok(f) => Ok(f),
        _ => Err(invalid(est, name, format!("expected a number in {}, got {}", range, v))),
    }
}

fn depth(est: &'static str, name: &str, v: ParamValue) -> ModelResult<Option<usize>> {
    match v {
        ParamValue::None => Ok(None),
        other => count(est, name, other, 1).map(Some),
    }
}

fn unknown(est: &'static str, name: &str) -> ModelError {
    invalid(est, name, "unknown parameter")
}

/// Handles the CART growth limits; returns `Ok(false)` for names it does not own.
fn set_tree_param(params: &mut TreeParams, est: &'static str, name: &str, v: ParamValue) -> ModelResult<bool> {
    match name {
        "max_depth" => params.max_depth = depth(est, name, v)?,
        "min_samples_split" => params.min_samples_split = count(est, name, v, 2)?,
        "min_samples_leaf" => params.min_samples_leaf = count(est, name, v, 1)?,
        _ => return Ok(false),
    }
    Ok(true)
}

fn tree_params_into(set: &mut ParamSet, params: &TreeParams) {
    set.insert("max_depth", params.max_depth);
    set.insert("min_samples_split", params.min_samples_split);
    set.insert("min_samples_leaf", params.min_samples_leaf);
}

fn positive_class(proba: Tensor<f64>) -> ModelResult<Tensor<f64>> {
    let n = proba.nrows()?;
    if proba.ncols()? < 2 {
        // single-class training data: class 1 was never seen
        return Ok(Tensor::zeros(vec![n]));
    }
    Ok(proba.col(1)?)
}

fn ensure_fitted<E: Estimator + ?Sized>(est: &E) -> ModelResult<()> {
    if est.is_fitted() {
        Ok(())
    } else {
        Err(ModelError::NotFitted(est.name()))
    }
}

// ─── Random forests ─────────────────────────────────────────────────────────

macro_rules! forest_params {
    ($ty:ident, $label:expr) => {
        fn set_forest_param(m: &mut $ty<f64>, name: &str, v: ParamValue) -> ModelResult<()> {
            const EST: &str = $label;
            match name {
                "n_estimators" => m.n_estimators = count(EST, name, v, 1)?,
                "random_state" => m.random_state = seed(EST, name, v)?,
                _ => {
                    let mut params = m.tree_params.clone();
                    if !set_tree_param(&mut params, EST, name, v)? {
                        return Err(unknown(EST, name));
                    }
                    m.tree_params = params;
                }
            }
            Ok(())
        }

        fn forest_params(m: &$ty<f64>) -> ParamSet {
            let mut set = ParamSet::new();
            set.insert("n_estimators", m.n_estimators);
            set.insert("random_state", m.random_state as usize);
            tree_params_into(&mut set, &m.tree_params);
            set
        }
    };
}

mod rf_classifier {
    use super::*;
    forest_params!(RandomForestClassifier, "RandomForestClassifier");

    impl Estimator for RandomForestClassifier<f64> {
        fn name(&self) -> &'static str {
            "RandomForestClassifier"
        }

        fn task(&self) -> Task {
            Task::Classification
        }

        fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> ModelResult<()> {
            Ok(RandomForestClassifier::fit(self, x, y)?)
        }

        fn is_fitted(&self) -> bool {
            RandomForestClassifier::is_fitted(self)
        }

        fn predict(&self, x: &Tensor<f64>) -> ModelResult<Tensor<f64>> {
            ensure_fitted(self)?;
            Ok(RandomForestClassifier::predict(self, x)?)
        }

        fn predict_proba(&self, x: &Tensor<f64>) -> ModelResult<Tensor<f64>> {
            ensure_fitted(self)?;
            positive_class(RandomForestClassifier::predict_proba(self, x)?)
        }

        fn set_param(&mut self, name: &str, value: ParamValue) -> ModelResult<()> {
            set_forest_param(self, name, value)
        }

        fn params(&self) -> ParamSet {
            forest_params(self)
        }
    }
}

mod rf_regressor {
    use super::*;
    forest_params!(RandomForestRegressor, "RandomForestRegressor");

    impl Estimator for RandomForestRegressor<f64> {
        fn name(&self) -> &'static str {
            "RandomForestRegressor"
        }

        fn task(&self) -> Task {
            Task::Regression
        }

        fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> ModelResult<()> {
            Ok(RandomForestRegressor::fit(self, x, y)?)
        }

        fn is_fitted(&self) -> bool {
            RandomForestRegressor::is_fitted(self)
        }

        fn predict(&self, x: &Tensor<f64>) -> ModelResult<Tensor<f64>> {
            ensure_fitted(self)?;
            Ok(RandomForestRegressor::predict(self, x)?)
        }

        fn set_param(&mut self, name: &str, value: ParamValue) -> ModelResult<()> {
            set_forest_param(self, name, value)
        }

        fn params(&self) -> ParamSet {
            forest_params(self)
        }
    }
}

// ─── Gradient boosting ──────────────────────────────────────────────────────

macro_rules! boosting_params {
    ($ty:ident, $label:expr) => {
        fn set_boosting_param(m: &mut $ty<f64>, name: &str, v: ParamValue) -> ModelResult<()> {
            const EST: &str = $label;
            match name {
                "n_estimators" => m.n_estimators = count(EST, name, v, 1)?,
                "learning_rate" => m.learning_rate = real(EST, name, v, |f| f > 0.0, "(0, inf)")?,
                "subsample" => {
                    m.subsample = real(EST, name, v, |f| f > 0.0 && f <= 1.0, "(0, 1]")?
                }
                "random_state" => m.random_state = seed(EST, name, v)?,
                _ => {
                    let mut params = m.tree_params.clone();
                    if !set_tree_param(&mut params, EST, name, v)? {
                        return Err(unknown(EST, name));
                    }
                    m.tree_params = params;
                }
            }
            Ok(())
        }

        fn boosting_params(m: &$ty<f64>) -> ParamSet {
            let mut set = ParamSet::new();
            set.insert("n_estimators", m.n_estimators);
            set.insert("learning_rate", m.learning_rate);
            set.insert("subsample", m.subsample);
            set.insert("random_state", m.random_state as usize);
            tree_params_into(&mut set, &m.tree_params);
            set
        }
    };
}

mod gb_classifier {
    use super::*;
    boosting_params!(GradientBoostingClassifier, "GradientBoostingClassifier");

    impl Estimator for GradientBoostingClassifier<f64> {
        fn name(&self) -> &'static str {
            "GradientBoostingClassifier"
        }

        fn task(&self) -> Task {
            Task::Classification
        }

        fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> ModelResult<()> {
            Ok(GradientBoostingClassifier::fit(self, x, y)?)
        }

        fn is_fitted(&self) -> bool {
            GradientBoostingClassifier::is_fitted(self)
        }

        fn predict(&self, x: &Tensor<f64>) -> ModelResult<Tensor<f64>> {
            ensure_fitted(self)?;
            Ok(GradientBoostingClassifier::predict(self, x)?)
        }

        fn predict_proba(&self, x: &Tensor<f64>) -> ModelResult<Tensor<f64>> {
            ensure_fitted(self)?;
            positive_class(GradientBoostingClassifier::predict_proba(self, x)?)
        }

        fn set_param(&mut self, name: &str, value: ParamValue) -> ModelResult<()> {
            set_boosting_param(self, name, value)
        }

        fn params(&self) -> ParamSet {
            boosting_params(self)
        }
    }
}

mod gb_regressor {
    use super::*;
    boosting_params!(GradientBoostingRegressor, "GradientBoostingRegressor");

    impl Estimator for GradientBoostingRegressor<f64> {
        fn name(&self) -> &'static str {
            "GradientBoostingRegressor"
        }

        fn task(&self) -> Task {
            Task::Regression
        }

        fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> ModelResult<()> {
            Ok(GradientBoostingRegressor::fit(self, x, y)?)
        }

        fn is_fitted(&self) -> bool {
            GradientBoostingRegressor::is_fitted(self)
        }

        fn predict(&self, x: &Tensor<f64>) -> ModelResult<Tensor<f64>> {
            ensure_fitted(self)?;
            Ok(GradientBoostingRegressor::predict(self, x)?)
        }

        fn set_param(&mut self, name: &str, value: ParamValue) -> ModelResult<()> {
            set_boosting_param(self, name, value)
        }

        fn params(&self) -> ParamSet {
            boosting_params(self)
        }
    }
}

// ─── Second-order boosting ──────────────────────────────────────────────────

fn set_booster_param(params: &mut BoosterParams, est: &'static str, name: &str, v: ParamValue) -> ModelResult<()> {
    match name {
        "n_estimators" => params.n_estimators = count(est, name, v, 1)?,
        "learning_rate" | "eta" => {
            params.learning_rate = real(est, name, v, |f| f > 0.0, "(0, inf)")?
        }
        // unlimited depth is stored as 0
        "max_depth" => params.max_depth = depth(est, name, v)?.unwrap_or(0),
        "min_child_weight" => {
            params.min_child_weight = real(est, name, v, |f| f >= 0.0, "[0, inf)")?
        }
        "reg_lambda" | "lambda" => params.reg_lambda = real(est, name, v, |f| f >= 0.0, "[0, inf)")?,
        "gamma" | "min_split_loss" => params.gamma = real(est, name, v, |f| f >= 0.0, "[0, inf)")?,
        "subsample" => params.subsample = real(est, name, v, |f| f > 0.0 && f <= 1.0, "(0, 1]")?,
        "random_state" | "seed" => params.random_state = seed(est, name, v)?,
        _ => return Err(unknown(est, name)),
    }
    Ok(())
}

fn booster_params(params: &BoosterParams) -> ParamSet {
    let mut set = ParamSet::new();
    set.insert("n_estimators", params.n_estimators);
    set.insert("learning_rate", params.learning_rate);
    set.insert(
        "max_depth",
        if params.max_depth == 0 { None } else { Some(params.max_depth) },
    );
    set.insert("min_child_weight", params.min_child_weight);
    set.insert("reg_lambda", params.reg_lambda);
    set.insert("gamma", params.gamma);
    set.insert("subsample", params.subsample);
    set.insert("random_state", params.random_state as usize);
    set
}

impl Estimator for XGBClassifier<f64> {
    fn name(&self) -> &'static str {
        "XGBClassifier"
    }

    fn task(&self) -> Task {
        Task::Classification
    }

    fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> ModelResult<()> {
        Ok(XGBClassifier::fit(self, x, y)?)
    }

    fn is_fitted(&self) -> bool {
        XGBClassifier::is_fitted(self)
    }

    fn predict(&self, x: &Tensor<f64>) -> ModelResult<Tensor<f64>> {
        ensure_fitted(self)?;
        Ok(XGBClassifier::predict(self, x)?)
    }

    fn predict_proba(&self, x: &Tensor<f64>) -> ModelResult<Tensor<f64>> {
        ensure_fitted(self)?;
        positive_class(XGBClassifier::predict_proba(self, x)?)
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> ModelResult<()> {
        let mut params = self.params.clone();
        set_booster_param(&mut params, "XGBClassifier", name, value)?;
        self.params = params;
        Ok(())
    }

    fn params(&self) -> ParamSet {
        booster_params(&self.params)
    }
}

impl Estimator for XGBRegressor<f64> {
    fn name(&self) -> &'static str {
        "XGBRegressor"
    }

    fn task(&self) -> Task {
        Task::Regression
    }

    fn fit(&mut self, x: &Tensor<f64>, y: &Tensor<f64>) -> ModelResult<()> {
        Ok(XGBRegressor::fit(self, x, y)?)
    }

    fn is_fitted(&self) -> bool {
        XGBRegressor::is_fitted(self)
    }

    fn predict(&self, x: &Tensor<f64>) -> ModelResult<Tensor<f64>> {
        ensure_fitted(self)?;
        Ok(XGBRegressor::predict(self, x)?)
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> ModelResult<()> {
        let mut params = self.params.clone();
        set_booster_param(&mut params, "XGBRegressor", name, value)?;
        self.params = params;
        Ok(())
    }

    fn params(&self) -> ParamSet {
        booster_params(&self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> (Tensor<f64>, Tensor<f64>) {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 0.0 } else { 1.0 }).collect();
        (Tensor::from_vec2d(&rows).unwrap(), Tensor::from_slice(&y))
    }

    #[test]
    fn test_set_and_read_params() {
        let mut rf: RandomForestClassifier<f64> = RandomForestClassifier::new(100, None);
        rf.set_param("n_estimators", ParamValue::Int(7)).unwrap();
        rf.set_param("max_depth", ParamValue::Int(4)).unwrap();
        let p = rf.params();
        assert_eq!(p.get("n_estimators"), Some(&ParamValue::Int(7)));
        assert_eq!(p.get("max_depth"), Some(&ParamValue::Int(4)));
        assert_eq!(rf.tree_params.max_depth, Some(4));
    }

    #[test]
    fn test_unknown_and_out_of_range_params() {
        let mut gb: GradientBoostingRegressor<f64> = GradientBoostingRegressor::new(100, 0.1, 3);
        assert!(matches!(
            gb.set_param("min_child_weight", ParamValue::Int(1)),
            Err(ModelError::InvalidParameter { .. })
        ));
        assert!(gb.set_param("learning_rate", ParamValue::Float(-0.5)).is_err());
        assert!(gb.set_param("min_samples_split", ParamValue::Int(1)).is_err());
        assert_eq!(gb.learning_rate, 0.1);

        let mut xgb: XGBRegressor<f64> = XGBRegressor::new(BoosterParams::default());
        assert!(xgb.set_param("min_samples_split", ParamValue::Int(2)).is_err());
        xgb.set_param("eta", ParamValue::Float(0.05)).unwrap();
        assert_eq!(xgb.params.learning_rate, 0.05);
    }

    #[test]
    fn test_predict_before_fit_is_not_fitted() {
        let (x, _) = toy();
        let rf: RandomForestRegressor<f64> = RandomForestRegressor::new(5, None);
        assert_eq!(
            Estimator::predict(&rf, &x).unwrap_err(),
            ModelError::NotFitted("RandomForestRegressor")
        );
    }

    #[test]
    fn test_score_and_proba() {
        let (x, y) = toy();
        let mut gb: GradientBoostingClassifier<f64> = GradientBoostingClassifier::new(30, 0.1, 2);
        Estimator::fit(&mut gb, &x, &y).unwrap();
        assert_eq!(Estimator::score(&gb, &x, &y).unwrap(), 1.0);

        let proba = Estimator::predict_proba(&gb, &x).unwrap();
        assert_eq!(proba.shape_vec(), vec![20]);
        assert!(proba.data()[0] < 0.5 && proba.data()[19] > 0.5);
    }

    #[test]
    fn test_regressor_has_no_proba() {
        let (x, y) = toy();
        let mut xgb: XGBRegressor<f64> = XGBRegressor::new(BoosterParams {
            n_estimators: 5,
            ..BoosterParams::default()
        });
        Estimator::fit(&mut xgb, &x, &y).unwrap();
        assert!(matches!(
            Estimator::predict_proba(&xgb, &x),
            Err(ModelError::NoProbabilities("XGBRegressor"))
        ));
    }
}
