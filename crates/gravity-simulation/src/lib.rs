//! # Gravity Simulation Engine
//!
//! GPU-based planets-and-ships simulation: planets are placed once, ships are
//! pulled by every planet and integrated each frame in a compute shader, and the
//! results are read back into host-visible snapshots for a renderer.

pub mod buffers;
pub mod config;
pub mod context;
pub mod error;
pub mod kernels;
pub mod simulation;

pub use config::*;
pub use context::GpuContext;
pub use error::*;
pub use kernels::ComputePrograms;
pub use simulation::*;

pub use gravity_physics::{Planet, Ship, ShipStats};
