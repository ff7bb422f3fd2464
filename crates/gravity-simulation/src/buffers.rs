//! Device buffers for one simulation run
//!
//! Planet and ship buffers are sized for at least one record so a zero count
//! never produces a zero-sized binding. Each has a cached staging buffer for
//! readback.

use bytemuck::Pod;
use gravity_physics::{GpuParams, Planet, Ship};
use wgpu::util::DeviceExt;

use crate::error::DeviceError;

pub struct SimulationBuffers {
    params_buffer: wgpu::Buffer,
    planet_buffer: wgpu::Buffer,
    ship_buffer: wgpu::Buffer,
    planet_staging_buffer: wgpu::Buffer,
    ship_staging_buffer: wgpu::Buffer,
}

/// Bytes needed for `count` records of `T`, never less than one record
pub fn record_bytes<T>(count: u32) -> u64 {
    u64::from(count.max(1)) * std::mem::size_of::<T>() as u64
}

fn check_size(label: &'static str, size: u64, limits: &wgpu::Limits) -> Result<(), DeviceError> {
    let limit = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
    if size > limit {
        return Err(DeviceError::BufferTooLarge { label, size, limit });
    }
    Ok(())
}

impl SimulationBuffers {
    /// Allocate every buffer or none.
    ///
    /// Allocation runs inside out-of-memory and validation error scopes; on
    /// error all buffers created so far are destroyed before returning.
    pub fn allocate(device: &wgpu::Device, params: &GpuParams) -> Result<Self, DeviceError> {
        let planet_size = record_bytes::<Planet>(params.planet_count());
        let ship_size = record_bytes::<Ship>(params.ship_count());

        let limits = device.limits();
        check_size("Planet Buffer", planet_size, &limits)?;
        check_size("Ship Buffer", ship_size, &limits)?;

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Simulation Params Buffer"),
            contents: bytemuck::bytes_of(params),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let planet_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Planet Buffer"),
            size: planet_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let ship_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ship Buffer"),
            size: ship_size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let planet_staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Planet Staging Buffer"),
            size: planet_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let ship_staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ship Staging Buffer"),
            size: ship_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let buffers = Self {
            params_buffer,
            planet_buffer,
            ship_buffer,
            planet_staging_buffer,
            ship_staging_buffer,
        };

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(error) = validation.or(out_of_memory) {
            // Failed creations leave invalid handles behind; destroying them reports more errors
            device.push_error_scope(wgpu::ErrorFilter::Validation);
            buffers.destroy();
            let _ = pollster::block_on(device.pop_error_scope());
            return Err(DeviceError::Allocation(error.to_string()));
        }

        log::info!("Buffers created (planets: {planet_size} bytes, ships: {ship_size} bytes)");
        Ok(buffers)
    }

    fn bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.planet_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.ship_buffer.as_entire_binding(),
                },
            ],
        })
    }

    pub fn init_bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::BindGroup {
        self.bind_group(device, layout, "Init Bind Group")
    }

    pub fn update_bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
    ) -> wgpu::BindGroup {
        self.bind_group(device, layout, "Update Bind Group")
    }

    pub fn write_params(&self, queue: &wgpu::Queue, params: &GpuParams) {
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));
    }

    pub fn write_delta_time(&self, queue: &wgpu::Queue, delta_time: f32) {
        queue.write_buffer(
            &self.params_buffer,
            GpuParams::DELTA_TIME_OFFSET,
            bytemuck::bytes_of(&delta_time),
        );
    }

    /// Replace `out` with the first `count` planets on the device
    pub fn read_planets(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        count: u32,
        out: &mut Vec<Planet>,
    ) -> Result<(), DeviceError> {
        read_buffer(
            device,
            queue,
            &self.planet_buffer,
            &self.planet_staging_buffer,
            count,
            out,
        )
    }

    /// Replace `out` with the first `count` ships on the device
    pub fn read_ships(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        count: u32,
        out: &mut Vec<Ship>,
    ) -> Result<(), DeviceError> {
        read_buffer(
            device,
            queue,
            &self.ship_buffer,
            &self.ship_staging_buffer,
            count,
            out,
        )
    }

    /// Release every device buffer. Consumes `self`, so it runs once per allocation.
    pub fn destroy(self) {
        self.params_buffer.destroy();
        self.planet_buffer.destroy();
        self.ship_buffer.destroy();
        self.planet_staging_buffer.destroy();
        self.ship_staging_buffer.destroy();
    }
}

/// Copy `count` records from `source` through `staging` and overwrite `out`.
///
/// Blocks until the copy (and all previously submitted work) has finished.
fn read_buffer<T: Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &wgpu::Buffer,
    staging: &wgpu::Buffer,
    count: u32,
    out: &mut Vec<T>,
) -> Result<(), DeviceError> {
    let byte_size = u64::from(count) * std::mem::size_of::<T>() as u64;
    out.clear();
    if byte_size == 0 {
        return Ok(());
    }

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(source, 0, staging, 0, byte_size);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..byte_size);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })
        .map_err(|e| DeviceError::Readback(format!("device poll failed: {e}")))?;
    receiver
        .recv()
        .map_err(|e| DeviceError::Readback(format!("channel closed: {e}")))?
        .map_err(|e| DeviceError::Readback(format!("buffer mapping failed: {e}")))?;

    {
        let data = slice.get_mapped_range();
        out.extend_from_slice(bytemuck::cast_slice(&data));
    }
    staging.unmap();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_bytes_floors_at_one_record() {
        assert_eq!(record_bytes::<Planet>(0), 24);
        assert_eq!(record_bytes::<Ship>(0), 32);
        assert_eq!(record_bytes::<Planet>(10), 240);
        assert_eq!(record_bytes::<Ship>(10), 320);
    }

    #[test]
    fn oversized_buffers_are_rejected_before_allocation() {
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: 1024,
            ..wgpu::Limits::default()
        };
        assert_eq!(check_size("Ship Buffer", 1024, &limits), Ok(()));
        assert_eq!(
            check_size("Ship Buffer", 1056, &limits),
            Err(DeviceError::BufferTooLarge {
                label: "Ship Buffer",
                size: 1056,
                limit: 1024,
            })
        );
    }
}
