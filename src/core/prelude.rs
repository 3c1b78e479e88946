pub use super::base::*;
pub use super::error::*;
pub use super::film::*;
pub use super::geometry::*;
pub use super::lowdiscrepancy::*;
pub use super::misc::*;
pub use super::param_set::*;
pub use super::progress::*;
pub use super::rng::*;
pub use super::sampling::*;
pub use super::spectrum::*;
