pub mod distribution;
pub mod sampling;

pub use distribution::*;
pub use sampling::*;
