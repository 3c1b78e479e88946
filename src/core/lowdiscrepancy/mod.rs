pub mod gray_code;
pub mod rotation;
pub mod sobol;

pub use gray_code::*;
pub use rotation::*;
pub use sobol::*;
