mod negotiator;
mod role;

pub use negotiator::*;
pub use role::*;
