//! The band gap training pipeline: load a featurized dataset, split, scale,
//! optionally tune, evaluate, refit on everything and persist, once for the
//! semiconductor classifier and once for the band gap regressor.

pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod predictor;
pub mod report;
pub mod training;

pub use artifacts::{ArtifactPaths, ArtifactStore, FsArtifactStore};
pub use config::{PipelineConfig, TaskSchema};
pub use dataset::load_task_data;
pub use error::{PipelineError, PipelineResult};
pub use predictor::{BandGapPredictor, Prediction, ScaledModel};
pub use report::MetricsReport;
pub use training::{train_and_save_models, train_task, TaskMetrics, TaskOutcome, TrainingSummary};
