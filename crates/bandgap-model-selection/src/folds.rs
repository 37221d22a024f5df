use std::collections::BTreeMap;

use bandgap_core::Tensor;

use crate::error::{SearchError, SearchResult};

/// Row indices of one train/validation partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

impl Fold {
    fn from_validation(n: usize, validation: Vec<usize>) -> Self {
        let mut in_val = vec![false; n];
        for &i in &validation {
            in_val[i] = true;
        }
        let train = (0..n).filter(|&i| !in_val[i]).collect();
        Fold { train, validation }
    }
}

/// Splits `n` labelled rows into folds.
pub trait CrossValidator {
    fn split(&self, y: &Tensor<f64>) -> SearchResult<Vec<Fold>>;
}

fn check_k(k: usize, n: usize) -> SearchResult<usize> {
    let k = k.min(n);
    if k < 2 {
        return Err(SearchError::InsufficientData(format!(
            "{} rows cannot be split into at least 2 folds",
            n
        )));
    }
    Ok(k)
}

/// Contiguous, unshuffled k-fold. The first `n % k` folds get one extra row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KFold {
    pub n_splits: usize,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        KFold { n_splits }
    }
}

impl CrossValidator for KFold {
    fn split(&self, y: &Tensor<f64>) -> SearchResult<Vec<Fold>> {
        let n = y.numel();
        let k = check_k(self.n_splits, n)?;
        let mut folds = Vec::with_capacity(k);
        let mut start = 0;
        for f in 0..k {
            let size = n / k + usize::from(f < n % k);
            folds.push(Fold::from_validation(n, (start..start + size).collect()));
            start += size;
        }
        Ok(folds)
    }
}

/// K-fold that keeps class proportions: the members of each class, in row
/// order, are dealt round-robin onto the folds.
///
/// `n_splits` is lowered to the size of the smallest class (but never
/// below 2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StratifiedKFold {
    pub n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        StratifiedKFold { n_splits }
    }
}

impl CrossValidator for StratifiedKFold {
    fn split(&self, y: &Tensor<f64>) -> SearchResult<Vec<Fold>> {
        let n = y.numel();
        let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (i, &v) in y.data().iter().enumerate() {
            by_class.entry(v.round() as i64).or_default().push(i);
        }
        let smallest = by_class.values().map(Vec::len).min().unwrap_or(0);
        let k = check_k(self.n_splits.min(smallest.max(2)), n)?;

        let mut validation = vec![Vec::new(); k];
        for members in by_class.values() {
            for (j, &row) in members.iter().enumerate() {
                validation[j % k].push(row);
            }
        }
        Ok(validation
            .into_iter()
            .map(|mut v| {
                v.sort_unstable();
                Fold::from_validation(n, v)
            })
            .collect())
    }
}
