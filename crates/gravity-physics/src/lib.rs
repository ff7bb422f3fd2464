//! # Gravity Physics
//!
//! GPU-shared record layouts, the packed parameter block, the per-index random
//! streams and CPU reference versions of the planet/ship compute kernels.

pub mod body;
pub mod params;
pub mod random;
pub mod reference;
pub mod stats;

pub use body::*;
pub use params::*;
pub use random::*;
pub use stats::*;
