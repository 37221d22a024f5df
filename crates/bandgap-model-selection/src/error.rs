use bandgap_core::TensorError;
use bandgap_models::ModelError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("not enough data for cross-validation: {0}")]
    InsufficientData(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Tensor(#[from] TensorError),
}

pub type SearchResult<T> = Result<T, SearchError>;
