use std::cmp::Ordering;

use bandgap_core::{Float, Tensor, TensorError, TensorResult};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::arena::{Node, Tree};
use crate::decision_tree::{check_width, check_xy, class_labels};
use crate::gradient_boosting::{sigmoid, subsample_rows};

/// Settings of the second-order booster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoosterParams {
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf weight (`eta`).
    pub learning_rate: f64,
    /// `0` means unlimited.
    pub max_depth: usize,
    /// Minimum hessian sum required in each child.
    pub min_child_weight: f64,
    /// L2 penalty on leaf weights.
    pub reg_lambda: f64,
    /// Minimum loss reduction to keep a split.
    pub gamma: f64,
    pub subsample: f64,
    pub random_state: u64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        BoosterParams {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            gamma: 0.0,
            subsample: 1.0,
            random_state: 0,
        }
    }
}

impl BoosterParams {
    fn validate(&self) -> TensorResult<()> {
        let bad = |name: &str, v: f64| {
            Err(TensorError::InvalidOperation(format!(
                "invalid booster parameter {}: {}",
                name, v
            )))
        };
        if !(self.learning_rate > 0.0) {
            return bad("learning_rate", self.learning_rate);
        }
        if !(self.min_child_weight >= 0.0) {
            return bad("min_child_weight", self.min_child_weight);
        }
        if !(self.reg_lambda >= 0.0) {
            return bad("reg_lambda", self.reg_lambda);
        }
        if !(self.gamma >= 0.0) {
            return bad("gamma", self.gamma);
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return bad("subsample", self.subsample);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum Objective {
    SquaredError,
    Logistic,
}

impl Objective {
    /// Gradient and hessian of the loss at raw score `f` for target `y`.
    fn grad_hess(&self, y: f64, f: f64) -> (f64, f64) {
        match self {
            Objective::SquaredError => (f - y, 1.0),
            Objective::Logistic => {
                let p = sigmoid(f);
                (p - y, (p * (1.0 - p)).max(1e-16))
            }
        }
    }
}

/// Greedy exact-split tree builder on gradient statistics.
struct NewtonGrower<'a, T: Float> {
    x: &'a [T],
    cols: usize,
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a BoosterParams,
}

impl<'a, T: Float> NewtonGrower<'a, T> {
    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        -g / (h + self.params.reg_lambda) * self.params.learning_rate
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.reg_lambda)
    }

    fn build(&self, tree: &mut Tree<T, T>, rows: Vec<usize>, depth: usize) -> usize {
        let g: f64 = rows.iter().map(|&r| self.grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| self.hess[r]).sum();

        let at_limit = self.params.max_depth > 0 && depth >= self.params.max_depth;
        let split = if at_limit || rows.len() < 2 {
            None
        } else {
            self.best_split(&rows, g, h)
        };

        let Some((feature, threshold)) = split else {
            let w = self.leaf_weight(g, h);
            return tree.push(Node::Leaf { value: T::from_f64(w) });
        };

        let id = tree.push(Node::Split {
            feature,
            threshold,
            left: usize::MAX,
            right: usize::MAX,
        });
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.x[r * self.cols + feature] <= threshold);
        let left = self.build(tree, left_rows, depth + 1);
        let right = self.build(tree, right_rows, depth + 1);
        tree.set(
            id,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            },
        );
        id
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<(usize, T)> {
        let n = rows.len();
        let mcw = self.params.min_child_weight;
        let parent = self.score(g, h);
        let mut best: Option<(f64, usize, T)> = None;
        let mut pairs: Vec<(T, usize)> = Vec::with_capacity(n);

        for f in 0..self.cols {
            pairs.clear();
            pairs.extend(rows.iter().map(|&r| (self.x[r * self.cols + f], r)));
            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

            let (mut gl, mut hl) = (0.0, 0.0);
            for k in 0..n - 1 {
                gl += self.grad[pairs[k].1];
                hl += self.hess[pairs[k].1];
                if pairs[k].0 >= pairs[k + 1].0 {
                    continue;
                }
                let (gr, hr) = (g - gl, h - hl);
                if hl < mcw || hr < mcw {
                    continue;
                }
                let gain = 0.5 * (self.score(gl, hl) + self.score(gr, hr) - parent)
                    - self.params.gamma;
                if gain > 1e-12 && best.map_or(true, |(b, _, _)| gain > b) {
                    let (a, b) = (pairs[k].0, pairs[k + 1].0);
                    let mut threshold = (a + b) / T::TWO;
                    if threshold >= b || !threshold.is_finite() {
                        threshold = a;
                    }
                    best = Some((gain, f, threshold));
                }
            }
        }
        best.map(|(_, f, t)| (f, t))
    }
}

/// Additive ensemble of regression trees fitted with Newton boosting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
struct Booster<T: Float> {
    objective: Objective,
    base_score: f64,
    trees: Vec<Tree<T, T>>,
    n_features: usize,
}

impl<T: Float> Booster<T> {
    fn new(objective: Objective) -> Self {
        Booster {
            objective,
            base_score: 0.0,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    fn fit(&mut self, x: &Tensor<T>, targets: &[f64], params: &BoosterParams) -> TensorResult<()> {
        params.validate()?;
        let n = targets.len();
        let cols = x.ncols()?;

        let mean = targets.iter().sum::<f64>() / n as f64;
        self.base_score = match self.objective {
            Objective::SquaredError => mean,
            Objective::Logistic => {
                let p = mean.clamp(1e-6, 1.0 - 1e-6);
                (p / (1.0 - p)).ln()
            }
        };

        let mut raw = vec![self.base_score; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut rng = StdRng::seed_from_u64(params.random_state);

        self.trees.clear();
        for _ in 0..params.n_estimators {
            for i in 0..n {
                let (g, h) = self.objective.grad_hess(targets[i], raw[i]);
                grad[i] = g;
                hess[i] = h;
            }
            let rows = subsample_rows(n, params.subsample, &mut rng);
            let grower = NewtonGrower {
                x: x.data(),
                cols,
                grad: &grad,
                hess: &hess,
                params,
            };
            let mut tree = Tree::new();
            grower.build(&mut tree, rows, 0);

            for (i, r) in raw.iter_mut().enumerate() {
                *r += tree.leaf_value(x.row(i)?)?.to_f64();
            }
            self.trees.push(tree);
        }
        self.n_features = cols;
        Ok(())
    }

    fn raw_scores(&self, x: &Tensor<T>) -> TensorResult<Vec<f64>> {
        let n = check_width(x, self.n_features)?;
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let row = x.row(i)?;
            let mut s = self.base_score;
            for tree in &self.trees {
                s += tree.leaf_value(row)?.to_f64();
            }
            out.push(s);
        }
        Ok(out)
    }
}

/// Second-order gradient boosted regressor (squared error objective).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct XGBRegressor<T: Float> {
    pub params: BoosterParams,
    booster: Booster<T>,
}

impl<T: Float> XGBRegressor<T> {
    pub fn new(params: BoosterParams) -> Self {
        XGBRegressor {
            params,
            booster: Booster::new(Objective::SquaredError),
        }
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> TensorResult<()> {
        check_xy(x, y)?;
        let targets: Vec<f64> = y.data().iter().map(|v| v.to_f64()).collect();
        self.booster.fit(x, &targets, &self.params)
    }

    pub fn predict(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let raw = self.booster.raw_scores(x)?;
        let n = raw.len();
        Tensor::new(raw.into_iter().map(T::from_f64).collect(), vec![n])
    }

    pub fn n_trees(&self) -> usize {
        self.booster.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.booster.n_features > 0
    }
}

/// Second-order gradient boosted binary classifier (logistic objective).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct XGBClassifier<T: Float> {
    pub params: BoosterParams,
    booster: Booster<T>,
}

impl<T: Float> XGBClassifier<T> {
    pub fn new(params: BoosterParams) -> Self {
        XGBClassifier {
            params,
            booster: Booster::new(Objective::Logistic),
        }
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> TensorResult<()> {
        check_xy(x, y)?;
        let (labels, n_classes) = class_labels(y)?;
        if n_classes > 2 {
            return Err(TensorError::InvalidOperation(format!(
                "binary classifier got label {}",
                n_classes - 1
            )));
        }
        self.booster.fit(x, &labels, &self.params)
    }

    /// Class probabilities, shape `[rows, 2]`.
    pub fn predict_proba(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let raw = self.booster.raw_scores(x)?;
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
        let raw = self.booster.raw_scores(x)?;
        let n = raw.len();
        let preds = raw
            .into_iter()
            .map(|r| if r > 0.0 { T::ONE } else { T::ZERO })
            .collect();
        Tensor::new(preds, vec![n])
    }

    pub fn n_trees(&self) -> usize {
        self.booster.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.booster.n_features > 0
    }
}
