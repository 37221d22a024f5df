use std::cmp::Ordering;
use std::collections::BTreeMap;

use bandgap_core::{Float, Tensor, TensorError, TensorResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::arena::{Node, Tree};

/// How many features each split may consider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    All,
    Sqrt,
    Log2,
    /// Fraction of the feature count, in (0, 1].
    Fraction(f64),
    Count(usize),
}

impl MaxFeatures {
    /// Number of features to draw per split, always within `1..=n_features`.
    pub fn resolve(&self, n_features: usize) -> usize {
        let k = match *self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fraction(f) => (f * n_features as f64).floor() as usize,
            MaxFeatures::Count(c) => c,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Growth limits shared by every CART tree in the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
        }
    }
}

/// Split quality measure. Statistics are accumulated in a flat `f64` buffer:
/// class counts for Gini, `[sum, sum_sq]` for squared error.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Criterion {
    Gini { n_classes: usize },
    Mse,
}

impl Criterion {
    fn width(&self) -> usize {
        match self {
            Criterion::Gini { n_classes } => *n_classes,
            Criterion::Mse => 2,
        }
    }

    fn add(&self, acc: &mut [f64], y: f64) {
        match self {
            Criterion::Gini { .. } => acc[y as usize] += 1.0,
            Criterion::Mse => {
                acc[0] += y;
                acc[1] += y * y;
            }
        }
    }

    /// `n * impurity` for a node holding `n` samples.
    fn weighted_impurity(&self, acc: &[f64], n: f64) -> f64 {
        if n <= 0.0 {
            return 0.0;
        }
        match self {
            Criterion::Gini { .. } => n - acc.iter().map(|c| c * c).sum::<f64>() / n,
            Criterion::Mse => (acc[1] - acc[0] * acc[0] / n).max(0.0),
        }
    }
}

/// Depth-first CART builder over a row-major feature buffer.
pub(crate) struct Grower<'a, T: Float> {
    x: &'a [T],
    cols: usize,
    y: &'a [f64],
    params: &'a TreeParams,
    criterion: Criterion,
    n_try: usize,
}

impl<'a, T: Float> Grower<'a, T> {
    pub(crate) fn new(
        x: &'a Tensor<T>,
        y: &'a [f64],
        params: &'a TreeParams,
        criterion: Criterion,
    ) -> TensorResult<Self> {
        let cols = x.ncols()?;
        Ok(Grower {
            x: x.data(),
            cols,
            y,
            params,
            criterion,
            n_try: params.max_features.resolve(cols),
        })
    }

    pub(crate) fn grow<L, F>(&self, rows: Vec<usize>, rng: &mut StdRng, leaf: &F) -> Tree<T, L>
    where
        F: Fn(&[usize]) -> L,
    {
        let mut tree = Tree::new();
        self.build(&mut tree, rows, 0, rng, leaf);
        tree
    }

    fn build<L, F>(
        &self,
        tree: &mut Tree<T, L>,
        rows: Vec<usize>,
        depth: usize,
        rng: &mut StdRng,
        leaf: &F,
    ) -> usize
    where
        F: Fn(&[usize]) -> L,
    {
        let n = rows.len();
        let mut total = vec![0.0; self.criterion.width()];
        for &r in &rows {
            self.criterion.add(&mut total, self.y[r]);
        }
        let impurity = self.criterion.weighted_impurity(&total, n as f64) / (n.max(1) as f64);

        let stop = self.params.max_depth.map_or(false, |d| depth >= d)
            || n < self.params.min_samples_split.max(2)
            || n < 2 * self.params.min_samples_leaf.max(1)
            || impurity <= 1e-12;

        let split = if stop {
            None
        } else {
            self.best_split(&rows, &total, rng)
        };

        let Some((feature, threshold)) = split else {
            return tree.push(Node::Leaf { value: leaf(&rows) });
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
        let left = self.build(tree, left_rows, depth + 1, rng, leaf);
        let right = self.build(tree, right_rows, depth + 1, rng, leaf);
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

    /// Sorted sweep over candidate features. Returns `(feature, threshold)`.
    ///
    /// Features are visited in random order; constant features do not count
    /// towards `max_features`, and the search keeps going past that budget
    /// until at least one valid split has been found.
    fn best_split(&self, rows: &[usize], total: &[f64], rng: &mut StdRng) -> Option<(usize, T)> {
        let n = rows.len();
        let width = total.len();
        let min_leaf = self.params.min_samples_leaf.max(1);

        let mut features: Vec<usize> = (0..self.cols).collect();
        if self.n_try < self.cols {
            features.shuffle(rng);
        }

        let mut best: Option<(f64, usize, T)> = None;
        let mut visited = 0;
        let mut pairs: Vec<(T, usize)> = Vec::with_capacity(n);
        let mut left = vec![0.0; width];
        let mut right = vec![0.0; width];

        for &f in &features {
            if visited >= self.n_try && best.is_some() {
                break;
            }
            pairs.clear();
            pairs.extend(rows.iter().map(|&r| (self.x[r * self.cols + f], r)));
            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            if pairs[0].0 >= pairs[n - 1].0 {
                continue;
            }
            visited += 1;

            left.iter_mut().for_each(|v| *v = 0.0);
            for k in 0..n - 1 {
                self.criterion.add(&mut left, self.y[pairs[k].1]);
                let n_left = k + 1;
                let n_right = n - n_left;
                if pairs[k].0 >= pairs[k + 1].0 || n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                for j in 0..width {
                    right[j] = total[j] - left[j];
                }
                let score = self.criterion.weighted_impurity(&left, n_left as f64)
                    + self.criterion.weighted_impurity(&right, n_right as f64);
                if best.map_or(true, |(b, _, _)| score < b) {
                    let (a, b) = (pairs[k].0, pairs[k + 1].0);
                    let mut threshold = (a + b) / T::TWO;
                    if threshold >= b || !threshold.is_finite() {
                        threshold = a;
                    }
                    best = Some((score, f, threshold));
                }
            }
        }

        best.map(|(_, f, t)| (f, t))
    }
}

/// Validate a feature matrix / target pair and return `(rows, features)`.
pub(crate) fn check_xy<T: Float>(x: &Tensor<T>, y: &Tensor<T>) -> TensorResult<(usize, usize)> {
    let n = x.nrows()?;
    let p = x.ncols()?;
    if n == 0 || p == 0 {
        return Err(TensorError::EmptyTensor);
    }
    if y.numel() != n {
        return Err(TensorError::ShapeMismatch {
            expected: vec![n],
            got: vec![y.numel()],
        });
    }
    Ok((n, p))
}

pub(crate) fn check_width<T: Float>(x: &Tensor<T>, n_features: usize) -> TensorResult<usize> {
    if n_features == 0 {
        return Err(TensorError::InvalidOperation("Model not fitted".into()));
    }
    let p = x.ncols()?;
    if p != n_features {
        return Err(TensorError::DimensionMismatch(format!(
            "model was fitted on {} features, got {}",
            n_features, p
        )));
    }
    x.nrows()
}

/// Labels as class indices; rejects negative or fractional values.
pub(crate) fn class_labels<T: Float>(y: &Tensor<T>) -> TensorResult<(Vec<f64>, usize)> {
    let mut labels = Vec::with_capacity(y.numel());
    let mut max_label = 0usize;
    for &v in y.data() {
        let f = v.to_f64();
        if !(f >= 0.0) || f.fract() != 0.0 {
            return Err(TensorError::InvalidOperation(format!(
                "class labels must be non-negative integers, got {}",
                f
            )));
        }
        max_label = max_label.max(f as usize);
        labels.push(f);
    }
    Ok((labels, max_label + 1))
}

pub(crate) fn argmax<T: Float>(values: &[T]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Decision Tree Classifier using CART (Gini impurity).
///
/// Leaves store class frequencies, so `predict_proba` is available.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct DecisionTreeClassifier<T: Float> {
    pub params: TreeParams,
    pub random_state: u64,
    pub n_classes: usize,
    n_features: usize,
    tree: Tree<T, Vec<T>>,
}

impl<T: Float> DecisionTreeClassifier<T> {
    pub fn new(params: TreeParams) -> Self {
        DecisionTreeClassifier {
            params,
            random_state: 0,
            n_classes: 0,
            n_features: 0,
            tree: Tree::new(),
        }
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> TensorResult<()> {
        let (n, _) = check_xy(x, y)?;
        let (labels, n_classes) = class_labels(y)?;
        let mut rng = StdRng::seed_from_u64(self.random_state);
        self.fit_rows(x, &labels, n_classes, (0..n).collect(), &mut rng)
    }

    /// Fit on a subset (possibly with repeats) of the rows of `x`.
    pub(crate) fn fit_rows(
        &mut self,
        x: &Tensor<T>,
        labels: &[f64],
        n_classes: usize,
        rows: Vec<usize>,
        rng: &mut StdRng,
    ) -> TensorResult<()> {
        let grower = Grower::new(x, labels, &self.params, Criterion::Gini { n_classes })?;
        let leaf = |rows: &[usize]| {
            let mut counts = vec![0usize; n_classes];
            for &r in rows {
                counts[labels[r] as usize] += 1;
            }
            let total = T::from_usize(rows.len().max(1));
            counts.into_iter().map(|c| T::from_usize(c) / total).collect::<Vec<T>>()
        };
        self.tree = grower.grow(rows, rng, &leaf);
        self.n_classes = n_classes;
        self.n_features = x.ncols()?;
        Ok(())
    }

    /// Class probabilities, shape `[rows, n_classes]`.
    pub fn predict_proba(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let n = check_width(x, self.n_features)?;
        let mut out = Vec::with_capacity(n * self.n_classes);
        for i in 0..n {
            out.extend_from_slice(self.tree.leaf_value(x.row(i)?)?);
        }
        Tensor::new(out, vec![n, self.n_classes])
    }

    pub fn predict(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let n = check_width(x, self.n_features)?;
        let mut preds = Vec::with_capacity(n);
        for i in 0..n {
            let proba = self.tree.leaf_value(x.row(i)?)?;
            preds.push(T::from_usize(argmax(proba)));
        }
        Tensor::new(preds, vec![n])
    }

    pub fn depth(&self) -> usize {
        self.tree.depth()
    }

    pub fn n_leaves(&self) -> usize {
        self.tree.n_leaves()
    }
}

/// Decision Tree Regressor using CART (squared error).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float")]
pub struct DecisionTreeRegressor<T: Float> {
    pub params: TreeParams,
    pub random_state: u64,
    n_features: usize,
    tree: Tree<T, T>,
}

impl<T: Float> DecisionTreeRegressor<T> {
    pub fn new(params: TreeParams) -> Self {
        DecisionTreeRegressor {
            params,
            random_state: 0,
            n_features: 0,
            tree: Tree::new(),
        }
    }

    pub fn fit(&mut self, x: &Tensor<T>, y: &Tensor<T>) -> TensorResult<()> {
        let (n, _) = check_xy(x, y)?;
        let targets: Vec<f64> = y.data().iter().map(|v| v.to_f64()).collect();
        let mut rng = StdRng::seed_from_u64(self.random_state);
        self.fit_rows(x, &targets, (0..n).collect(), &mut rng)
    }

    pub(crate) fn fit_rows(
        &mut self,
        x: &Tensor<T>,
        targets: &[f64],
        rows: Vec<usize>,
        rng: &mut StdRng,
    ) -> TensorResult<()> {
        let grower = Grower::new(x, targets, &self.params, Criterion::Mse)?;
        let leaf = |rows: &[usize]| {
            let sum: f64 = rows.iter().map(|&r| targets[r]).sum();
            T::from_f64(sum / rows.len().max(1) as f64)
        };
        self.tree = grower.grow(rows, rng, &leaf);
        self.n_features = x.ncols()?;
        Ok(())
    }

    /// Replace every leaf value with `f(rows reaching that leaf)`.
    ///
    /// Used by boosting to swap mean residuals for Newton steps.
    pub(crate) fn update_leaves<F>(&mut self, x: &Tensor<T>, rows: &[usize], f: F) -> TensorResult<()>
    where
        F: Fn(&[usize]) -> T,
    {
        let mut by_leaf: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &r in rows {
            by_leaf.entry(self.tree.leaf_id(x.row(r)?)?).or_default().push(r);
        }
        for (id, members) in by_leaf {
            if let Some(value) = self.tree.leaf_mut(id) {
                *value = f(&members);
            }
        }
        Ok(())
    }

    pub fn predict(&self, x: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let n = check_width(x, self.n_features)?;
        let mut preds = Vec::with_capacity(n);
        for i in 0..n {
            preds.push(*self.tree.leaf_value(x.row(i)?)?);
        }
        Tensor::new(preds, vec![n])
    }

    pub fn depth(&self) -> usize {
        self.tree.depth()
    }

    pub fn n_leaves(&self) -> usize {
        self.tree.n_leaves()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_decision_tree_classifier() {
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![0.0], vec![1.0], vec![2.0], vec![3.0],
            vec![4.0], vec![5.0], vec![6.0], vec![7.0],
        ]).unwrap();
        let y: Tensor<f64> = Tensor::from_slice(&[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);

        let mut tree = DecisionTreeClassifier::new(TreeParams::default());
        tree.fit(&x, &y).unwrap();
        let pred = tree.predict(&x).unwrap();

        assert_eq!(pred.data(), y.data());
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);

        let proba = tree.predict_proba(&x).unwrap();
        assert_eq!(proba.shape_vec(), vec![8, 2]);
        assert_abs_diff_eq!(proba.get(&[0, 0]).unwrap(), 1.0);
    }

    #[test]
    fn test_xor_needs_zero_gain_split() {
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0],
        ]).unwrap();
        let y: Tensor<f64> = Tensor::from_slice(&[0.0, 1.0, 1.0, 0.0]);
        let mut tree = DecisionTreeClassifier::new(TreeParams::default());
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&x).unwrap().data(), y.data());
    }

    #[test]
    fn test_max_depth_and_min_leaf() {
        let rows: Vec<Vec<f64>> = (0..32).map(|i| vec![i as f64]).collect();
        let x = Tensor::from_vec2d(&rows).unwrap();
        let y = Tensor::from_slice(&(0..32).map(|i| (i * i) as f64).collect::<Vec<_>>());

        let mut shallow = DecisionTreeRegressor::new(TreeParams {
            max_depth: Some(2),
            ..TreeParams::default()
        });
        shallow.fit(&x, &y).unwrap();
        assert!(shallow.depth() <= 2);
        assert!(shallow.n_leaves() <= 4);

        let mut leafy = DecisionTreeRegressor::new(TreeParams {
            min_samples_leaf: 8,
            ..TreeParams::default()
        });
        leafy.fit(&x, &y).unwrap();
        assert!(leafy.n_leaves() <= 4);
    }

    #[test]
    fn test_decision_tree_regressor() {
        let x: Tensor<f64> = Tensor::from_vec2d(&[
            vec![1.0], vec![2.0], vec![3.0], vec![4.0],
        ]).unwrap();
        let y: Tensor<f64> = Tensor::from_slice(&[2.0, 4.0, 6.0, 8.0]);

        let mut tree = DecisionTreeRegressor::new(TreeParams::default());
        tree.fit(&x, &y).unwrap();
        let pred = tree.predict(&x).unwrap();
        assert_eq!(pred.data(), y.data());
    }

    #[test]
    fn test_predict_checks_width_and_fit_state() {
        let tree = DecisionTreeRegressor::<f64>::new(TreeParams::default());
        let x = Tensor::from_vec2d(&[vec![1.0, 2.0]]).unwrap();
        assert!(tree.predict(&x).is_err());

        let mut tree = DecisionTreeRegressor::new(TreeParams::default());
        tree.fit(&x, &Tensor::from_slice(&[1.0])).unwrap();
        let wide = Tensor::from_vec2d(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(matches!(tree.predict(&wide), Err(TensorError::DimensionMismatch(_))));
    }

    #[test]
    fn test_rejects_fractional_labels() {
        let x = Tensor::from_vec2d(&[vec![0.0], vec![1.0]]).unwrap();
        let y = Tensor::from_slice(&[0.0, 0.5]);
        let mut tree = DecisionTreeClassifier::new(TreeParams::default());
        assert!(tree.fit(&x, &y).is_err());
    }

    #[test]
    fn test_max_features_resolve() {
        assert_eq!(MaxFeatures::Sqrt.resolve(136), 11);
        assert_eq!(MaxFeatures::All.resolve(136), 136);
        assert_eq!(MaxFeatures::Fraction(0.001).resolve(10), 1);
        assert_eq!(MaxFeatures::Count(500).resolve(10), 10);
        assert_eq!(MaxFeatures::Log2.resolve(8), 3);
    }
}
