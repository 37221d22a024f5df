use bandgap_core::{Float, Tensor, TensorResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::decision_tree::{
    argmax, check_width, check_xy, class_labels, DecisionTreeClassifier, DecisionTreeRegressor,
    MaxFeatures, TreeParams,
};

/// Per-tree seeds drawn up front so parallel fitting stays reproducible.
fn tree_seeds(random_state: u64, n: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(random_state);
    (0..n).map(|_| rng.gen()).collect()
}

fn bootstrap_rows(n: usize, bootstrap: bool, rng: &mut StdRng) -> Vec<usize> {
    if bootstrap {
        (0..n).map(|_| rng.gen_range(0..n)).collect()
    } else {
        (0..n).collect()
    }
}

/// Random Forest Classifier: bagged CART trees with per-split feature sampling.
///
/// Probabilities are the mean of the trees' leaf frequencies (soft voting).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct RandomForestClassifier<T: Float> {
    pub n_estimators: usize,
    pub tree_params: TreeParams,
    pub bootstrap: bool,
    pub random_state: u64,
    pub n_classes: usize,
    n_features: usize,
    trees: Vec<DecisionTreeClassifier<T>>,
}

impl<T: Float> RandomForestClassifier<T> {
    pub fn new(n_estimators: usize, max_depth: Option<usize>) -> Self {
        RandomForestClassifier {
            n_estimators,
            tree_params: TreeParams {
                max_depth,
                max_features: MaxFeatures::Sqrt,
                ..TreeParams::default()
            },
            bootstrap: true,
            random_state: 0,
            n_classes: 0,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> TensorResult<()> {
        let (n, p) = check_xy(x, y)?;
        let (labels, n_classes) = class_labels(y)?;
        let seeds = tree_seeds(self.random_state, self.n_estimators.max(1));

        let trees = seeds
            .into_par_iter()
            .map(|seed| -> TensorResult<DecisionTreeClassifier<T>> {
                let mut rng = StdRng::seed_from_u64(seed);
                let rows = bootstrap_rows(n, self.bootstrap, &mut rng);
                let mut tree = DecisionTreeClassifier::new(self.tree_params.clone());
                tree.random_state = seed;
                tree.fit_rows(x, &labels, n_classes, rows, &mut rng)?;
                Ok(tree)
            })
            .collect::<TensorResult<Vec<_>>>()?;

        self.trees = trees;
        self.n_classes = n_classes;
        self.n_features = p;
        Ok(())
    }

    /// Averaged class probabilities, shape `[rows, n_classes]`.
    pub fn predict_proba(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let n = check_width(x, self.n_features)?;
        let mut acc = vec![T::ZERO; n * self.n_classes];
        for tree in &self.trees {
            let proba = tree.predict_proba(x)?;
            for (a, &p) in acc.iter_mut().zip(proba.data()) {
                *a += p;
            }
        }
        let k = T::from_usize(self.trees.len());
        Tensor::new(acc.into_iter().map(|v| v / k).collect(), vec![n, self.n_classes])
    }

    pub fn predict(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let proba = self.predict_proba(x)?;
        let n = proba.nrows()?;
        let mut preds = Vec::with_capacity(n);
        for i in 0..n {
            preds.push(T::from_usize(argmax(proba.row(i)?)));
        }
        Tensor::new(preds, vec![n])
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.n_features > 0
    }
}

/// Random Forest Regressor: mean of bagged regression trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct RandomForestRegressor<T: Float> {
    pub n_estimators: usize,
    pub tree_params: TreeParams,
    pub bootstrap: bool,
    pub random_state: u64,
    n_features: usize,
    trees: Vec<DecisionTreeRegressor<T>>,
}

impl<T: Float> RandomForestRegressor<T> {
    pub fn new(n_estimators: usize, max_depth: Option<usize>) -> Self {
        RandomForestRegressor {
            n_estimators,
            tree_params: TreeParams {
                max_depth,
                ..TreeParams::default()
            },
            bootstrap: true,
            random_state: 0,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> TensorResult<()> {
        let (n, p) = check_xy(x, y)?;
        let targets: Vec<f64> = y.data().iter().map(|v| v.to_f64()).collect();
        let seeds = tree_seeds(self.random_state, self.n_estimators.max(1));

        let trees = seeds
            .into_par_iter()
            .map(|seed| -> TensorResult<DecisionTreeRegressor<T>> {
                let mut rng = StdRng::seed_from_u64(seed);
                let rows = bootstrap_rows(n, self.bootstrap, &mut rng);
                let mut tree = DecisionTreeRegressor::new(self.tree_params.clone());
                tree.random_state = seed;
                tree.fit_rows(x, &targets, rows, &mut rng)?;
                Ok(tree)
            })
            .collect::<TensorResult<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = p;
        Ok(())
    }

    pub fn predict(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let n = check_width(x, self.n_features)?;
        let mut sum = vec![T::ZERO; n];
        for tree in &self.trees {
            let pred = tree.predict(x)?;
            for (s, &v) in sum.iter_mut().zip(pred.data()) {
                *s += v;
            }
        }
        let k = T::from_usize(self.trees.len());
        Tensor::new(sum.into_iter().map(|v| v / k).collect(), vec![n])
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.n_features > 0
    }
}
