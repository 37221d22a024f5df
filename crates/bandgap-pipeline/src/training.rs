use std::path::PathBuf;

use bandgap_core::Tensor;
use bandgap_metrics::{ClassificationMetrics, RegressionMetrics};
use bandgap_model_selection::{fit_default, ParamsProvenance};
use bandgap_models::{resolve, Estimator, Model, ModelFamily, Task};
use bandgap_preprocessing::{train_test_split, StandardScaler, Transformer};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::artifacts::{ArtifactPaths, ArtifactStore};
use crate::config::PipelineConfig;
use crate::dataset::load_task_data;
use crate::error::PipelineResult;
use crate::report::MetricsReport;

/// Held-out scores of one task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TaskMetrics {
    Classification(ClassificationMetrics),
    Regression(RegressionMetrics),
}

/// What one task produced.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task: Task,
    pub provenance: ParamsProvenance,
    /// Computed on the held-out split with the train-only scaler.
    pub metrics: TaskMetrics,
    /// Mean CV score of the winning candidate, when a search ran.
    pub cv_score: Option<f64>,
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
}

/// Result of a full run for one family.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub family: ModelFamily,
    pub classification: TaskOutcome,
    pub regression: TaskOutcome,
    pub artifacts: ArtifactPaths,
}

fn evaluate(task: Task, model: &Model, x_test: &Tensor<f64>, y_test: &Tensor<f64>) -> PipelineResult<TaskMetrics> {
    let pred = model.predict(x_test)?;
    let metrics = match task {
        Task::Classification => {
            let m = ClassificationMetrics::compute(y_test, &pred)?;
            info!(
                accuracy = m.accuracy,
                precision = m.precision,
                recall = m.recall,
                f1 = m.f1,
                "classification metrics"
            );
            TaskMetrics::Classification(m)
        }
        Task::Regression => {
            let m = RegressionMetrics::compute(y_test, &pred)?;
            info!(
                r2 = m.r2,
                mae = m.mae,
                mse = m.mse,
                rmse = m.rmse,
                explained_variance = m.explained_variance,
                "regression metrics"
            );
            TaskMetrics::Regression(m)
        }
    };
    Ok(metrics)
}

/// Run one task end to end: load, split, scale on the training split, tune
/// (or take defaults), score the held-out split, append the report section,
/// then fit a fresh scaler and model on every row and persist both.
pub fn train_task(
    config: &PipelineConfig,
    task: Task,
    store: &dyn ArtifactStore,
    report: &MetricsReport,
) -> PipelineResult<TaskOutcome> {
    let span = info_span!("train_task", family = %config.family, task = %task);
    let _enter = span.enter();

    let schema = config.schema(task);
    let (x, y) = load_task_data(config.data_path(task), schema, task)?;
    let (x_train, x_test, y_train, y_test) = train_test_split(&x, &y, config.test_ratio, schema.split_seed)?;
    info!(train = y_train.numel(), test = y_test.numel(), "split dataset");

    let mut eval_scaler = StandardScaler::new();
    let x_train = eval_scaler.fit_transform(&x_train)?;
    let x_test = eval_scaler.transform(&x_test)?;

    let ctor = resolve(config.family, task);
    let outcome = if config.use_search {
        let space = config.search_space(task);
        config.search(task).search(ctor, &space, &x_train, &y_train)?
    } else {
        info!("search disabled, using default parameters");
        fit_default(ctor, &x_train, &y_train)?
    };
    info!(params = %outcome.best_params, "selected parameters");

    let metrics = evaluate(task, &outcome.best_estimator, &x_test, &y_test)?;
    match &metrics {
        TaskMetrics::Classification(m) => report.append_classification(&outcome.best_params, m)?,
        TaskMetrics::Regression(m) => report.append_regression(&outcome.best_params, m)?,
    }

    // Final artifacts see every row; the evaluation scaler is discarded.
    let mut final_scaler = StandardScaler::new();
    let x_all = final_scaler.fit_transform(&x)?;
    let mut final_model = ctor();
    if let Some(params) = outcome.best_params.overrides() {
        final_model.set_params(params)?;
    }
    final_model.fit(&x_all, &y)?;
    info!(rows = y.numel(), "fitted final model on the full dataset");

    let model_path = store.save_model(config.family, task, &final_model)?;
    let scaler_path = store.save_scaler(config.family, task, &final_scaler)?;

    Ok(TaskOutcome {
        task,
        provenance: outcome.best_params,
        metrics,
        cv_score: outcome.best_score,
        model_path,
        scaler_path,
    })
}

/// Train, evaluate and persist the classifier and then the regressor of
/// `config.family`. A rerun overwrites the previous set.
pub fn train_and_save_models(config: &PipelineConfig, store: &dyn ArtifactStore) -> PipelineResult<TrainingSummary> {
    info!(family = %config.family, search = config.use_search, "starting model training");
    let artifacts = store.prepare(config.family)?;
    let report = MetricsReport::create(store.report_path(config.family), config.family)?;

    let classification = train_task(config, Task::Classification, store, &report)?;
    let regression = train_task(config, Task::Regression, store, &report)?;

    info!(dir = %artifacts.dir.display(), "all artifacts saved");
    Ok(TrainingSummary {
        family: config.family,
        classification,
        regression,
        artifacts,
    })
}
