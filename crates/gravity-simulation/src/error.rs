//! Error types for the simulation driver.

use thiserror::Error;

use crate::simulation::SimulationState;

/// Fatal, non-retriable configuration problems
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{what} must be greater than zero")]
    ZeroCount { what: &'static str },

    #[error("{name} must be finite")]
    NonFinite { name: &'static str },

    #[error("area_min must be below area_max on the {axis} axis ({min} >= {max})")]
    EmptyArea { axis: char, min: f32, max: f32 },

    #[error("{name} is inverted or negative ({min}..={max})")]
    InvalidRange { name: &'static str, min: f32, max: f32 },

    #[error("{name} = {value} is outside {min}..={max}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("min_distance must be positive, got {0}")]
    NonPositiveMinDistance(f32),

    #[error("{interactions} planet-ship interactions per step exceed the budget of {limit}")]
    WorkloadTooLarge { interactions: u64, limit: u64 },

    #[error("compute program `{program}` is missing")]
    MissingProgram { program: &'static str },

    #[error("compute program `{program}` failed to compile: {message}")]
    ProgramCompilation {
        program: &'static str,
        message: String,
    },

    #[error("kernel `{kernel}` could not be resolved: {message}")]
    KernelResolution {
        kernel: &'static str,
        message: String,
    },
}

/// Device-side failures; the run is over but a fresh `initialize` may succeed
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),

    #[error("failed to create GPU device: {0}")]
    Device(String),

    #[error("buffer `{label}` needs {size} bytes, device allows {limit}")]
    BufferTooLarge {
        label: &'static str,
        size: u64,
        limit: u64,
    },

    #[error("failed to allocate GPU buffers: {0}")]
    Allocation(String),

    #[error("dispatch of `{kernel}` failed: {message}")]
    Dispatch {
        kernel: &'static str,
        message: String,
    },

    #[error("readback failed: {0}")]
    Readback(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("simulation is not ready (state: {state:?})")]
    NotReady { state: SimulationState },

    #[error("simulation is already initialized (state: {state:?}); shut it down first")]
    AlreadyInitialized { state: SimulationState },

    #[error("simulation failed earlier and is inert")]
    Failed,

    #[error("delta time must be finite and non-negative, got {0}")]
    InvalidDeltaTime(f32),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
