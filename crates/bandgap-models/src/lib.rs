pub mod error;
pub mod estimator;
pub mod family;
pub mod model;
pub mod params;
pub mod registry;

pub use error::{ModelError, ModelResult};
pub use estimator::Estimator;
pub use family::{ModelFamily, Task};
pub use model::Model;
pub use params::{HyperparameterSpace, ParamSet, ParamValue};
pub use registry::{default_search_space, entries, resolve, EstimatorConstructor};
