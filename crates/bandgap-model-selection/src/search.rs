use std::fmt;

use bandgap_core::Tensor;
use bandgap_models::{Estimator, EstimatorConstructor, HyperparameterSpace, Model, ParamSet, Task};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SearchResult;
use crate::folds::{CrossValidator, Fold, KFold, StratifiedKFold};
use crate::sampler::ParameterSampler;

/// Where the hyperparameters of a trained model came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamsProvenance {
    /// Library defaults; no search ran.
    Default,
    /// Winner of a cross-validated search.
    Searched(ParamSet),
}

impl ParamsProvenance {
    /// Overrides to apply on top of the library defaults.
    pub fn overrides(&self) -> Option<&ParamSet> {
        match self {
            ParamsProvenance::Default => None,
            ParamsProvenance::Searched(p) => Some(p),
        }
    }
}

impl fmt::Display for ParamsProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamsProvenance::Default => f.write_str("Default parameters"),
            ParamsProvenance::Searched(p) => write!(f, "{}", p),
        }
    }
}

/// Cross-validation record of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub params: ParamSet,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

/// Result of tuning one estimator on a training split.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Fitted on the whole training split.
    pub best_estimator: Model,
    pub best_params: ParamsProvenance,
    /// Mean validation score of the winner; `None` when no search ran.
    pub best_score: Option<f64>,
    pub cv_results: Vec<CandidateResult>,
}

/// Fit a default-configured estimator once, without any search.
pub fn fit_default(ctor: EstimatorConstructor, x: &Tensor<f64>, y: &Tensor<f64>) -> SearchResult<SearchOutcome> {
    let mut model = ctor();
    model.fit(x, y)?;
    Ok(SearchOutcome {
        best_estimator: model,
        best_params: ParamsProvenance::Default,
        best_score: None,
        cv_results: Vec::new(),
    })
}

/// Randomized search over a grid-shaped space with k-fold cross-validation.
///
/// Every (candidate, fold) pair is fitted on its own fresh estimator in
/// parallel; scores come from [`Estimator::score`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomizedSearch {
    pub n_iter: usize,
    pub cv: usize,
    pub random_state: u64,
    pub task: Task,
}

impl RandomizedSearch {
    /// 20 candidates for classification, 50 for regression, 5 folds, seed 42.
    pub fn new(task: Task) -> Self {
        RandomizedSearch {
            n_iter: match task {
                Task::Classification => 20,
                Task::Regression => 50,
            },
            cv: 5,
            random_state: 42,
            task,
        }
    }

    fn folds(&self, y: &Tensor<f64>) -> SearchResult<Vec<Fold>> {
        match self.task {
            Task::Classification => StratifiedKFold::new(self.cv).split(y),
            Task::Regression => KFold::new(self.cv).split(y),
        }
    }

    pub fn search(
        &self,
        ctor: EstimatorConstructor,
        space: &HyperparameterSpace,
        x: &Tensor<f64>,
        y: &Tensor<f64>,
    ) -> SearchResult<SearchOutcome> {
        if space.is_empty() {
            warn!(
                task = %self.task,
                "hyperparameter space is empty, training with default parameters"
            );
            return fit_default(ctor, x, y);
        }

        let params = ParameterSampler::new(space, self.n_iter, self.random_state).candidates();

        // Apply every candidate up front so bad names fail before any fitting.
        let prototypes = params
            .iter()
            .map(|p| -> SearchResult<Model> {
                let mut model = ctor();
                model.set_params(p)?;
                Ok(model)
            })
            .collect::<SearchResult<Vec<Model>>>()?;

        let folds = self.folds(y)?;
        let fold_data = folds
            .iter()
            .map(|f| -> SearchResult<_> {
                Ok((
                    x.select_rows(&f.train)?,
                    y.select_rows(&f.train)?,
                    x.select_rows(&f.validation)?,
                    y.select_rows(&f.validation)?,
                ))
            })
            .collect::<SearchResult<Vec<_>>>()?;

        info!(
            task = %self.task,
            candidates = prototypes.len(),
            folds = folds.len(),
            "starting randomized search"
        );

        let n_folds = fold_data.len();
        let scores = (0..prototypes.len() * n_folds)
            .into_par_iter()
            .map(|job| -> SearchResult<f64> {
                let (c, f) = (job / n_folds, job % n_folds);
                let (x_tr, y_tr, x_val, y_val) = &fold_data[f];
                let mut model = prototypes[c].clone();
                model.fit(x_tr, y_tr)?;
                Ok(model.score(x_val, y_val)?)
            })
            .collect::<SearchResult<Vec<f64>>>()?;

        let cv_results: Vec<CandidateResult> = params
            .into_iter()
            .zip(scores.chunks(n_folds))
            .map(|(params, fold_scores)| CandidateResult {
                mean_score: fold_scores.iter().sum::<f64>() / n_folds as f64,
                fold_scores: fold_scores.to_vec(),
                params,
            })
            .collect();

        let mut best = 0;
        for (i, r) in cv_results.iter().enumerate() {
            debug!(candidate = i, mean_score = r.mean_score, params = %r.params, "candidate scored");
            if r.mean_score > cv_results[best].mean_score {
                best = i;
            }
        }

        let winner = &cv_results[best];
        info!(
            task = %self.task,
            best_score = winner.mean_score,
            params = %winner.params,
            "search finished, refitting best candidate"
        );

        let mut best_estimator = prototypes[best].clone();
        best_estimator.fit(x, y)?;

        Ok(SearchOutcome {
            best_estimator,
            best_params: ParamsProvenance::Searched(winner.params.clone()),
            best_score: Some(winner.mean_score),
            cv_results,
        })
    }
}
