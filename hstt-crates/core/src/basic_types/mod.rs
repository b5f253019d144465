mod cost;
mod deviations;
mod random;
mod trail;

pub use cost::*;
pub use deviations::*;
pub use random::*;
pub(crate) use trail::*;
