use bandgap_core::{Float, Tensor, TensorError, TensorResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::decision_tree::{check_width, check_xy, class_labels, DecisionTreeRegressor, TreeParams};

/// Draw `round(n * fraction)` distinct rows (all rows when `fraction >= 1`).
pub(crate) fn subsample_rows(n: usize, fraction: f64, rng: &mut StdRng) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64 * fraction).round() as usize).clamp(1, n);
    let mut rows = rand::seq::index::sample(rng, n, k).into_vec();
    rows.sort_unstable();
    rows
}

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn check_hyperparams(learning_rate: f64, subsample: f64) -> TensorResult<()> {
    if !(learning_rate > 0.0) {
        return Err(TensorError::InvalidOperation(format!(
            "learning_rate must be positive, got {}",
            learning_rate
        )));
    }
    if !(subsample > 0.0 && subsample <= 1.0) {
        return Err(TensorError::InvalidOperation(format!(
            "subsample must be in (0, 1], got {}",
            subsample
        )));
    }
    Ok(())
}

/// Gradient Boosted Trees for Regression.
///
/// Uses gradient descent in function space by sequentially fitting
/// decision trees to the residuals (negative gradient of the squared loss).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct GradientBoostingRegressor<T: Float> {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub tree_params: TreeParams,
    pub subsample: f64,
    pub random_state: u64,
    trees: Vec<DecisionTreeRegressor<T>>,
    initial_prediction: T,
    n_features: usize,
}

impl<T: Float> GradientBoostingRegressor<T> {
    pub fn new(n_estimators: usize, learning_rate: f64, max_depth: usize) -> Self {
        GradientBoostingRegressor {
            n_estimators,
            learning_rate,
            tree_params: TreeParams {
                max_depth: Some(max_depth),
                ..TreeParams::default()
            },
            subsample: 1.0,
            random_state: 0,
            trees: Vec::new(),
            initial_prediction: T::ZERO,
            n_features: 0,
        }
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> TensorResult<()> {
        let (n, p) = check_xy(x, y)?;
        check_hyperparams(self.learning_rate, self.subsample)?;
        let targets: Vec<f64> = y.data().iter().map(|v| v.to_f64()).collect();

        // Initial prediction: mean of y
        let init = targets.iter().sum::<f64>() / n as f64;
        let mut predictions = vec![init; n];
        let mut rng = StdRng::seed_from_u64(self.random_state);

        self.trees.clear();
        for _ in 0..self.n_estimators {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(&yi, &fi)| yi - fi)
                .collect();

            let rows = subsample_rows(n, self.subsample, &mut rng);
            let mut tree = DecisionTreeRegressor::new(self.tree_params.clone());
            tree.random_state = rng.gen();
            tree.fit_rows(x, &residuals, rows, &mut rng)?;

            let step = tree.predict(x)?;
            for (f, &s) in predictions.iter_mut().zip(step.data()) {
                *f += self.learning_rate * s.to_f64();
            }
            self.trees.push(tree);
        }

        self.initial_prediction = T::from_f64(init);
        self.n_features = p;
        Ok(())
    }

    pub fn predict(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let n = check_width(x, self.n_features)?;
        let mut predictions = vec![self.initial_prediction.to_f64(); n];
        for tree in &self.trees {
            let step = tree.predict(x)?;
            for (f, &s) in predictions.iter_mut().zip(step.data()) {
                *f += self.learning_rate * s.to_f64();
            }
        }
        Tensor::new(predictions.into_iter().map(T::from_f64).collect(), vec![n])
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.n_features > 0
    }
}

/// Gradient Boosted Trees for Binary Classification.
///
/// Log-loss objective: trees are grown on the pseudo-residuals
/// `y - sigmoid(F)` and each leaf is then replaced by a single Newton step
/// `sum(r) / sum(p * (1 - p))` over the rows it holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct GradientBoostingClassifier<T: Float> {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub tree_params: TreeParams,
    pub subsample: f64,
    pub random_state: u64,
    trees: Vec<DecisionTreeRegressor<T>>,
    initial_log_odds: T,
    n_features: usize,
}

impl<T: Float> GradientBoostingClassifier<T> {
    pub fn new(n_estimators: usize, learning_rate: f64, max_depth: usize) -> Self {
        GradientBoostingClassifier {
            n_estimators,
            learning_rate,
            tree_params: TreeParams {
                max_depth: Some(max_depth),
                ..TreeParams::default()
            },
            subsample: 1.0,
            random_state: 0,
            trees: Vec::new(),
            initial_log_odds: T::ZERO,
            n_features: 0,
        }
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> TensorResult<()> {
        let (n, p) = check_xy(x, y)?;
        check_hyperparams(self.learning_rate, self.subsample)?;
        let (labels, n_classes) = class_labels(y)?;
        if n_classes > 2 {
            return Err(TensorError::InvalidOperation(format!(
                "binary classifier got label {}",
                n_classes - 1
            )));
        }

        // Initial log-odds based on class proportions
        let prior = (labels.iter().sum::<f64>() / n as f64).clamp(1e-6, 1.0 - 1e-6);
        let init = (prior / (1.0 - prior)).ln();
        let mut raw = vec![init; n];
        let mut rng = StdRng::seed_from_u64(self.random_state);

        self.trees.clear();
        for _ in 0..self.n_estimators {
            let probs: Vec<f64> = raw.iter().map(|&r| sigmoid(r)).collect();
            let residuals: Vec<f64> = labels.iter().zip(&probs).map(|(&yi, &pi)| yi - pi).collect();

            let rows = subsample_rows(n, self.subsample, &mut rng);
            let mut tree = DecisionTreeRegressor::new(self.tree_params.clone());
            tree.random_state = rng.gen();
            tree.fit_rows(x, &residuals, rows.clone(), &mut rng)?;
            tree.update_leaves(x, &rows, |members| {
                let num: f64 = members.iter().map(|&r| residuals[r]).sum();
                let den: f64 = members.iter().map(|&r| probs[r] * (1.0 - probs[r])).sum();
                T::from_f64(if den.abs() < 1e-150 { 0.0 } else { num / den })
            })?;

            let step = tree.predict(x)?;
            for (r, &s) in raw.iter_mut().zip(step.data()) {
                *r += self.learning_rate * s.to_f64();
            }
            self.trees.push(tree);
        }

        self.initial_log_odds = T::from_f64(init);
        self.n_features = p;
        Ok(())
    }

    /// Raw log-odds for each row.
    pub fn decision_function(&self, x: &Tensor<T>) -> TensorResult<Vec<f64>> {
        let n = check_width(x, self.n_features)?;
        let mut raw = vec![self.initial_log_odds.to_f64(); n];
        for tree in &self.trees {
            let step = tree.predict(x)?;
            for (r, &s) in raw.iter_mut().zip(step.data()) {
                *r += self.learning_rate * s.to_f64();
            }
        }
        Ok(raw)
    }

    /// Class probabilities, shape `[rows, 2]`.
    pub fn predict_proba(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let raw = self.decision_function(x)?;
        let n = raw.len();
        let mut out = Vec::with_capacity(2 * n);
        for r in raw {
            let p1 = sigmoid(r);
            out.push(T::from_f64(1.0 - p1));
            out.push(T::from_f64(p1));
        }
        Tensor::new(out, vec![n, 2])
    }

    pub fn predict(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let raw = self.decision_function(x)?;
        let n = raw.len();
        let preds = raw
            .into_iter()
            .map(|r| if r > 0.0 { T::ONE } else { T::ZERO })
            .collect();
        Tensor::new(preds, vec![n])
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.n_features > 0
    }
}
