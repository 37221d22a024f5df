mod arena;
pub mod decision_tree;
pub mod random_forest;
pub mod gradient_boosting;
pub mod xgboost;

pub use decision_tree::*;
pub use random_forest::*;
pub use gradient_boosting::*;
pub use xgboost::*;
