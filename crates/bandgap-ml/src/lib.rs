//! # BandGap-ML
//!
//! Trains and serves the two models behind band gap prediction: a
//! semiconductor classifier and a band gap regressor, per algorithm family.
//!
//! ## Modules
//!
//! - **core**: Tensor engine: dense row-major matrices, row selection, column reductions
//! - **io**: I/O: CSV tables, JSON artifact serialization
//! - **preprocessing**: StandardScaler, seeded train/test split
//! - **tree**: Tree models: CART, Random Forest, Gradient Boosting, second-order boosting
//! - **metrics**: Evaluation: accuracy, precision, recall, F1, R², MAE, MSE, RMSE, explained variance
//! - **models**: Algorithm registry, hyperparameter spaces, the `Estimator` trait
//! - **model_selection**: K-fold, stratified k-fold, randomized search
//! - **pipeline**: Training run, artifact store, metrics report, predictor

/// Core tensor engine.
pub use bandgap_core as core;

/// CSV and artifact I/O.
pub use bandgap_io as io;

/// Data preprocessing.
pub use bandgap_preprocessing as preprocessing;

/// Tree-based models.
pub use bandgap_tree as tree;

/// Evaluation metrics.
pub use bandgap_metrics as metrics;

/// Registry and estimator interface.
pub use bandgap_models as models;

/// Cross-validation and hyperparameter search.
pub use bandgap_model_selection as model_selection;

/// Training pipeline and predictor.
pub use bandgap_pipeline as pipeline;

/// Commonly used items.
pub mod prelude {
    pub use bandgap_core::{Float, Tensor, TensorError, TensorResult};
    pub use bandgap_models::{Estimator, HyperparameterSpace, Model, ModelFamily, Task};
    pub use bandgap_pipeline::{
        train_and_save_models, ArtifactStore, BandGapPredictor, FsArtifactStore, PipelineConfig,
        PipelineError,
    };
    pub use bandgap_preprocessing::{StandardScaler, Transformer};
}

#[cfg(test)]
mod tests {
    use super::models;
    use super::prelude::*;

    #[test]
    fn test_prelude_reaches_every_family() {
        for family in ModelFamily::ALL {
            for task in Task::ALL {
                let model: Model = models::resolve(family, task)();
                assert!(!model.is_fitted());
            }
        }
        let config = PipelineConfig::default();
        assert_eq!(config.family, ModelFamily::RandomForest);
    }
}
