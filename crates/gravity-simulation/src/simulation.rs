//! GPU-based planets-and-ships simulation driver
//!
//! NOTE: The driver is synchronous. `initialize` and `step` submit their work
//! and block on the readback, so the host mirrors returned by [`Simulation::planets`]
//! and [`Simulation::ships`] always reflect completed dispatches and there is
//! never more than one dispatch in flight.

use gravity_physics::{GpuParams, Planet, Ship};

use crate::buffers::SimulationBuffers;
use crate::config::SimulationConfig;
use crate::context::GpuContext;
use crate::error::{DeviceError, Result, SimulationError};
use crate::kernels::{ComputePrograms, Kernel, Kernels};

/// Driver lifecycle.
///
/// `Uninitialized -> Ready -> Stepping -> ShutDown`, with `Failed` reachable
/// from any initialize or step error. `Failed` and `ShutDown` hold no device
/// buffers; a new `initialize` starts a fresh run from either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Uninitialized,
    Ready,
    Stepping,
    Failed,
    ShutDown,
}

/// Everything that lives exactly as long as one successful initialize
struct Run {
    config: SimulationConfig,
    params: GpuParams,
    kernels: Kernels,
    buffers: SimulationBuffers,
}

pub struct Simulation {
    device: wgpu::Device,
    queue: wgpu::Queue,
    programs: ComputePrograms,

    state: SimulationState,
    run: Option<Run>,

    // Host-visible mirrors, overwritten wholesale on every readback
    planets: Vec<Planet>,
    ships: Vec<Ship>,

    frame: u64,
    simulated_time: f64,
}

/// Submit `encoder` and surface validation errors as a dispatch failure
fn submit(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    encoder: wgpu::CommandEncoder,
    kernel: &'static str,
) -> std::result::Result<(), DeviceError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    queue.submit(std::iter::once(encoder.finish()));
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(DeviceError::Dispatch {
            kernel,
            message: error.to_string(),
        }),
        None => Ok(()),
    }
}

impl Simulation {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self::with_programs(device, queue, ComputePrograms::default())
    }

    pub fn from_context(context: GpuContext) -> Self {
        Self::new(context.device, context.queue)
    }

    /// Use custom WGSL programs instead of the built-in kernels
    pub fn with_programs(
        device: wgpu::Device,
        queue: wgpu::Queue,
        programs: ComputePrograms,
    ) -> Self {
        Self {
            device,
            queue,
            programs,
            state: SimulationState::Uninitialized,
            run: None,
            planets: Vec::new(),
            ships: Vec::new(),
            frame: 0,
            simulated_time: 0.0,
        }
    }

    /// Resolve kernels, allocate buffers, upload parameters, run both init
    /// kernels once and read planets and ships back.
    ///
    /// On any error the driver ends up `Failed` with no device buffers alive.
    pub fn initialize(&mut self, config: SimulationConfig) -> Result<()> {
        if matches!(self.state, SimulationState::Ready | SimulationState::Stepping) {
            log::error!("initialize called on a live simulation ({:?})", self.state);
            return Err(SimulationError::AlreadyInitialized { state: self.state });
        }

        log::info!(
            "Initializing simulation: {} planets, {} ships, seed {}",
            config.planet_count,
            config.ship_count,
            config.seed
        );

        self.planets.clear();
        self.ships.clear();
        self.frame = 0;
        self.simulated_time = 0.0;

        match self.start_run(config) {
            Ok(run) => {
                self.run = Some(run);
                self.state = SimulationState::Ready;
                log::info!("Simulation ready");
                Ok(())
            }
            Err(err) => {
                log::error!("Simulation initialization failed: {err}");
                self.planets.clear();
                self.ships.clear();
                self.state = SimulationState::Failed;
                Err(err)
            }
        }
    }

    fn start_run(&mut self, config: SimulationConfig) -> Result<Run> {
        config.validate()?;

        // Kernels first: a missing program or entry point must fail before any buffer exists
        let kernels = Kernels::resolve(&self.device, &self.programs)?;

        let params = config.to_gpu_params(0.0);
        let buffers = SimulationBuffers::allocate(&self.device, &params)?;

        if let Err(err) = self.seed_populations(&kernels, &buffers, &params) {
            buffers.destroy();
            return Err(err.into());
        }

        Ok(Run {
            config,
            params,
            kernels,
            buffers,
        })
    }

    fn seed_populations(
        &mut self,
        kernels: &Kernels,
        buffers: &SimulationBuffers,
        params: &GpuParams,
    ) -> std::result::Result<(), DeviceError> {
        buffers.write_params(&self.queue, params);
        let bind_group = buffers.init_bind_group(&self.device, &kernels.init_layout);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Init Encoder"),
            });

        // Separate passes: init_ships reads what init_planets wrote
        kernels
            .init_planets
            .encode(&mut encoder, &bind_group, params.planet_count());
        kernels
            .init_ships
            .encode(&mut encoder, &bind_group, params.ship_count());

        submit(&self.device, &self.queue, encoder, kernels.init_ships.name)?;

        let (planet_count, ship_count) = (params.planet_count(), params.ship_count());
        buffers.read_planets(&self.device, &self.queue, planet_count, &mut self.planets)?;
        buffers.read_ships(&self.device, &self.queue, ship_count, &mut self.ships)?;

        log::debug!(
            "Seeded {} planets and {} ships",
            self.planets.len(),
            self.ships.len()
        );
        Ok(())
    }

    /// Advance one frame.
    ///
    /// In order: re-bind the buffers to the update kernel, upload `delta_time`,
    /// dispatch, read the ships back. Blocks until the readback is complete.
    pub fn step(&mut self, delta_time: f32) -> Result<()> {
        match self.state {
            SimulationState::Ready | SimulationState::Stepping => {}
            SimulationState::Failed => {
                log::warn!("step ignored: simulation has failed");
                return Err(SimulationError::Failed);
            }
            state => {
                log::error!("step called without a live run ({state:?})");
                return Err(SimulationError::NotReady { state });
            }
        }

        if !delta_time.is_finite() || delta_time < 0.0 {
            log::error!("step rejected: delta time {delta_time} is not finite and non-negative");
            return Err(SimulationError::InvalidDeltaTime(delta_time));
        }

        let Some(run) = self.run.as_mut() else {
            return Err(SimulationError::NotReady { state: self.state });
        };

        if let Err(err) = Self::advance(&self.device, &self.queue, run, delta_time, &mut self.ships)
        {
            log::error!("Simulation step failed: {err}");
            self.fail();
            return Err(err.into());
        }

        self.frame += 1;
        self.simulated_time += f64::from(delta_time);
        self.state = SimulationState::Stepping;
        Ok(())
    }

    fn advance(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        run: &mut Run,
        delta_time: f32,
        ships: &mut Vec<Ship>,
    ) -> std::result::Result<(), DeviceError> {
        let kernel: &Kernel = &run.kernels.update_ships;

        let bind_group = run
            .buffers
            .update_bind_group(device, &run.kernels.update_layout);

        run.params.set_delta_time(delta_time);
        run.buffers.write_delta_time(queue, delta_time);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Simulation Encoder"),
        });
        kernel.encode(&mut encoder, &bind_group, run.params.ship_count());
        submit(device, queue, encoder, kernel.name)?;

        run.buffers
            .read_ships(device, queue, run.params.ship_count(), ships)
    }

    fn fail(&mut self) {
        if let Some(run) = self.run.take() {
            run.buffers.destroy();
        }
        self.planets.clear();
        self.ships.clear();
        self.state = SimulationState::Failed;
    }

    /// Release all device buffers.
    ///
    /// Safe to call repeatedly and after a failed initialize; only the first
    /// call after a successful initialize releases anything.
    pub fn shutdown(&mut self) {
        match self.run.take() {
            Some(run) => {
                run.buffers.destroy();
                self.planets.clear();
                self.ships.clear();
                self.state = SimulationState::ShutDown;
                log::info!(
                    "Simulation shut down after {} frames ({:.3}s simulated)",
                    self.frame,
                    self.simulated_time
                );
            }
            None => log::debug!("shutdown: no device buffers held ({:?})", self.state),
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Planet snapshot, stable between initialize and shutdown
    pub fn planets(&self) -> &[Planet] {
        &self.planets
    }

    /// Ship snapshot from the last completed readback
    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// Configuration of the current run, if any
    pub fn config(&self) -> Option<&SimulationConfig> {
        self.run.as_ref().map(|run| &run.config)
    }

    /// Parameter block as last uploaded, if a run is live
    pub fn params(&self) -> Option<&GpuParams> {
        self.run.as_ref().map(|run| &run.params)
    }

    /// Work-group width the kernels were resolved with
    pub fn group_width(&self) -> Option<u32> {
        self.run
            .as_ref()
            .map(|run| run.kernels.update_ships.group_width())
    }

    /// Successful steps since the last initialize
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn simulated_time(&self) -> f64 {
        self.simulated_time
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.shutdown();
    }
}
