use bandgap_core::TensorError;
use thiserror::Error;

/// Errors raised by the registry, parameter handling and estimators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("unknown model family '{name}', expected one of: {valid}")]
    UnknownFamily { name: String, valid: String },

    #[error("unknown task '{0}', expected 'classification' or 'regression'")]
    UnknownTask(String),

    #[error("invalid parameter '{name}' for {estimator}: {reason}")]
    InvalidParameter {
        estimator: &'static str,
        name: String,
        reason: String,
    },

    #[error("invalid hyperparameter space: {0}")]
    InvalidParamSpec(String),

    #[error("{0} is not fitted")]
    NotFitted(&'static str),

    #[error("{0} does not predict probabilities")]
    NoProbabilities(&'static str),

    #[error(transparent)]
    Tensor(#[from] TensorError),
}

pub type ModelResult<T> = Result<T, ModelError>;
