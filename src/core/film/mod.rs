pub mod contribution;
pub mod film;
pub mod sampling_map;

pub use contribution::*;
pub use film::*;
pub use sampling_map::*;
