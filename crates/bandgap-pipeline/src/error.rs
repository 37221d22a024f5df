use std::path::PathBuf;

use bandgap_core::TensorError;
use bandgap_io::IoError;
use bandgap_model_selection::SearchError;
use bandgap_models::ModelError;
use thiserror::Error;

/// Everything that can stop a training run or a predictor load.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to load dataset {path}: {source}")]
    DataLoad {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    #[error("dataset {path} does not match the expected layout: {reason}")]
    SchemaMismatch { path: PathBuf, reason: String },

    #[error("unknown model family '{name}', expected one of: {valid}")]
    UnknownFamily { name: String, valid: String },

    #[error("failed to persist {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    #[error("artifact {path} is not usable here: {reason}")]
    ArtifactMismatch { path: PathBuf, reason: String },

    #[error(transparent)]
    Model(ModelError),

    #[error(transparent)]
    Search(SearchError),

    #[error(transparent)]
    Tensor(#[from] TensorError),
}

impl From<ModelError> for PipelineError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::UnknownFamily { name, valid } => PipelineError::UnknownFamily { name, valid },
            ModelError::Tensor(t) => PipelineError::Tensor(t),
            other => PipelineError::Model(other),
        }
    }
}

impl From<SearchError> for PipelineError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::Model(m) => m.into(),
            SearchError::Tensor(t) => PipelineError::Tensor(t),
            other => PipelineError::Search(other),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
