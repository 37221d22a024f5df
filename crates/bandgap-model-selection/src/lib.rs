pub mod error;
pub mod folds;
pub mod sampler;
pub mod search;

pub use error::{SearchError, SearchResult};
pub use folds::{CrossValidator, Fold, KFold, StratifiedKFold};
pub use sampler::ParameterSampler;
pub use search::{fit_default, CandidateResult, ParamsProvenance, RandomizedSearch, SearchOutcome};
