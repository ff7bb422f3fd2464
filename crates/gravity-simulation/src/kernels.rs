//! Compute programs and kernel resolution
//!
//! Two WGSL modules back the three kernels: the init module exports
//! `init_planets` and `init_ships`, the update module exports `update_ships`.
//! `common.wgsl` (record layouts, parameter block, random streams) is prepended
//! to both.
//!
//! The work-group width is not baked into the shaders: it is the
//! pipeline-overridable constant `WORKGROUP_WIDTH`, picked from the device
//! limits while the kernels are resolved, and the same value sizes every
//! dispatch.

use std::borrow::Cow;

use crate::error::ConfigError;

/// Record layouts, parameter block and random streams shared by every program
pub const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");
const INIT_WGSL: &str = include_str!("shaders/init.wgsl");
const UPDATE_WGSL: &str = include_str!("shaders/update.wgsl");

pub const INIT_PLANETS_ENTRY: &str = "init_planets";
pub const INIT_SHIPS_ENTRY: &str = "init_ships";
pub const UPDATE_SHIPS_ENTRY: &str = "update_ships";

/// Preferred lanes per work-group, lowered to whatever the device supports
pub const PREFERRED_GROUP_WIDTH: u32 = 64;

/// WGSL sources for the init and update modules.
///
/// `None` marks a missing program; initialization then fails before any
/// buffer is created.
#[derive(Clone, Debug)]
pub struct ComputePrograms {
    pub init: Option<Cow<'static, str>>,
    pub update: Option<Cow<'static, str>>,
}

impl Default for ComputePrograms {
    fn default() -> Self {
        Self {
            init: Some(Cow::Owned(format!("{COMMON_WGSL}\n{INIT_WGSL}"))),
            update: Some(Cow::Owned(format!("{COMMON_WGSL}\n{UPDATE_WGSL}"))),
        }
    }
}

/// Work-group width the device can run, capped at [`PREFERRED_GROUP_WIDTH`]
pub fn resolve_group_width(limits: &wgpu::Limits) -> u32 {
    PREFERRED_GROUP_WIDTH
        .min(limits.max_compute_workgroup_size_x)
        .min(limits.max_compute_invocations_per_workgroup)
        .max(1)
}

/// `max(1, ceil(element_count / group_width))`
pub fn dispatch_groups(element_count: u32, group_width: u32) -> u32 {
    element_count.div_ceil(group_width.max(1)).max(1)
}

/// One resolved compute entry point
pub struct Kernel {
    pub name: &'static str,
    pipeline: wgpu::ComputePipeline,
    group_width: u32,
}

impl Kernel {
    pub fn group_width(&self) -> u32 {
        self.group_width
    }

    /// Record one pass covering `element_count` invocations
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        element_count: u32,
    ) {
        let groups = dispatch_groups(element_count, self.group_width);
        log::debug!(
            "Dispatching {} ({} elements, {} groups of {})",
            self.name,
            element_count,
            groups,
            self.group_width
        );

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(self.name),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.pipeline);
        compute_pass.set_bind_group(0, bind_group, &[]);
        compute_pass.dispatch_workgroups(groups, 1, 1);
    }
}

/// All three kernels plus the bind group layouts their buffers bind against
pub struct Kernels {
    pub init_layout: wgpu::BindGroupLayout,
    pub update_layout: wgpu::BindGroupLayout,
    pub init_planets: Kernel,
    pub init_ships: Kernel,
    pub update_ships: Kernel,
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn compile(
    device: &wgpu::Device,
    program: &'static str,
    source: Option<&Cow<'static, str>>,
) -> Result<wgpu::ShaderModule, ConfigError> {
    let source = source.ok_or(ConfigError::MissingProgram { program })?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(program),
        source: wgpu::ShaderSource::Wgsl(source.clone()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(ConfigError::ProgramCompilation {
            program,
            message: error.to_string(),
        }),
        None => Ok(module),
    }
}

fn resolve_kernel(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    name: &'static str,
    group_width: u32,
) -> Result<Kernel, ConfigError> {
    let constants = [("WORKGROUP_WIDTH", f64::from(group_width))];

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(name),
        layout: Some(layout),
        module,
        entry_point: Some(name),
        compilation_options: wgpu::PipelineCompilationOptions {
            constants: &constants,
            ..Default::default()
        },
        cache: None,
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(ConfigError::KernelResolution {
            kernel: name,
            message: error.to_string(),
        });
    }

    log::debug!("Resolved kernel {name} with work-group width {group_width}");
    Ok(Kernel {
        name,
        pipeline,
        group_width,
    })
}

impl Kernels {
    /// Compile both programs and look up all three entry points.
    ///
    /// Touches no simulation buffers, so a failure here leaves nothing to release.
    pub fn resolve(
        device: &wgpu::Device,
        programs: &ComputePrograms,
    ) -> Result<Self, ConfigError> {
        let init_module = compile(device, "init", programs.init.as_ref())?;
        let update_module = compile(device, "update", programs.update.as_ref())?;

        // 0: params (uniform)
        // 1: planets (storage, written by init_planets, read by init_ships)
        // 2: ships (storage, write)
        let init_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Init Bind Group Layout"),
            entries: &[
                uniform_entry(0),
                storage_entry(1, false),
                storage_entry(2, false),
            ],
        });

        // 0: params (uniform)
        // 1: planets (storage, read)
        // 2: ships (storage, read-write)
        let update_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Update Bind Group Layout"),
            entries: &[
                uniform_entry(0),
                storage_entry(1, true),
                storage_entry(2, false),
            ],
        });

        let init_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Init Pipeline Layout"),
            bind_group_layouts: &[&init_layout],
            push_constant_ranges: &[],
        });

        let update_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Update Pipeline Layout"),
                bind_group_layouts: &[&update_layout],
                push_constant_ranges: &[],
            });

        let group_width = resolve_group_width(&device.limits());

        let init_planets = resolve_kernel(
            device,
            &init_pipeline_layout,
            &init_module,
            INIT_PLANETS_ENTRY,
            group_width,
        )?;
        let init_ships = resolve_kernel(
            device,
            &init_pipeline_layout,
            &init_module,
            INIT_SHIPS_ENTRY,
            group_width,
        )?;
        let update_ships = resolve_kernel(
            device,
            &update_pipeline_layout,
            &update_module,
            UPDATE_SHIPS_ENTRY,
            group_width,
        )?;

        log::info!("Kernels resolved (work-group width {group_width})");

        Ok(Self {
            init_layout,
            update_layout,
            init_planets,
            init_ships,
            update_ships,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_never_rounds_to_zero_groups() {
        assert_eq!(dispatch_groups(0, 64), 1);
        assert_eq!(dispatch_groups(1, 64), 1);
        assert_eq!(dispatch_groups(64, 64), 1);
        assert_eq!(dispatch_groups(65, 64), 2);
        assert_eq!(dispatch_groups(1000, 256), 4);
        assert_eq!(dispatch_groups(10, 0), 10);
    }

    #[test]
    fn group_width_respects_device_limits() {
        let defaults = wgpu::Limits::default();
        assert_eq!(resolve_group_width(&defaults), PREFERRED_GROUP_WIDTH);

        let narrow = wgpu::Limits {
            max_compute_workgroup_size_x: 32,
            ..wgpu::Limits::default()
        };
        assert_eq!(resolve_group_width(&narrow), 32);

        let few_invocations = wgpu::Limits {
            max_compute_invocations_per_workgroup: 16,
            ..wgpu::Limits::default()
        };
        assert_eq!(resolve_group_width(&few_invocations), 16);
    }

    #[test]
    fn default_programs_export_every_entry_point() {
        let programs = ComputePrograms::default();
        let init = programs.init.as_deref().unwrap_or_default();
        let update = programs.update.as_deref().unwrap_or_default();

        assert!(init.contains(&format!("fn {INIT_PLANETS_ENTRY}(")));
        assert!(init.contains(&format!("fn {INIT_SHIPS_ENTRY}(")));
        assert!(update.contains(&format!("fn {UPDATE_SHIPS_ENTRY}(")));
        assert!(init.contains("override WORKGROUP_WIDTH"));
        assert!(update.contains("override WORKGROUP_WIDTH"));
    }
}
