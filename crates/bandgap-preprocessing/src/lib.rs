pub mod scaler;
pub mod split;

pub use scaler::*;
pub use split::*;
