//! Wavefront render engine.
//!
//! The image is split into work units of contiguous pixels. Each unit keeps one
//! ray slot per pixel and loops on its own stream: copy rays to the device,
//! intersect, shade, copy results back, then compact on the host so that slots
//! of finished paths are refilled with new samples for the least-sampled pixels
//! of the unit. Units are independent and run in parallel.

use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;

use crate::camera::Camera;
use crate::config::{ConfigError, RenderConfig};
use crate::device::{self, ConstantBuffer, DeviceError, HostDevice};
use crate::frame::Frame;
use crate::material::Lambertian;
use crate::scene::Heightmap;

pub mod compaction;
pub mod kernels;
pub mod stats;
pub mod work_unit;

pub use stats::RenderStats;
pub use work_unit::{Sample, WorkUnit};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// State shared read-only by every unit while rendering.
pub struct RenderContext {
    pub config: RenderConfig,
    pub device: Arc<HostDevice>,
    pub scene: ConstantBuffer<Heightmap>,
    pub material: ConstantBuffer<Lambertian>,
}

pub struct Renderer {
    ctx: RenderContext,
    units: Vec<WorkUnit>,
    frame: Frame,
}

impl Renderer {
    /// Set up the device, upload the scene and build the work units with one
    /// initial ray per pixel. Device failures abort the process.
    pub fn prepare(config: RenderConfig, scene: Heightmap, camera: Box<dyn Camera>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(device::check("prepare", Self::setup(config, scene, camera)))
    }

    /// Like `prepare`, but device failures are returned instead of aborting.
    pub fn try_prepare(config: RenderConfig, scene: Heightmap, camera: Box<dyn Camera>) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self::setup(config, scene, camera)?)
    }

    fn setup(config: RenderConfig, scene: Heightmap, camera: Box<dyn Camera>) -> Result<Self, DeviceError> {
        let device = Arc::new(HostDevice::new(config.device)?);

        let scene_bytes = scene.size_in_bytes();
        let scene = device.upload(scene, scene_bytes)?;
        let material = Lambertian::with_strategy(config.albedo, config.sampling);
        let material = device.upload(material, std::mem::size_of::<Lambertian>())?;

        let unit_len = config.unit_len();
        let units = (0..config.work_units)
            .map(|i| WorkUnit::new(&device, i, i * unit_len..(i + 1) * unit_len, config.seed))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            width = config.width,
            height = config.height,
            units = config.work_units,
            unit_len,
            device_bytes = device.memory_in_use(),
            pinned_bytes = device.pinned_in_use(),
            threads = device.num_threads(),
            "renderer prepared"
        );
        let uncovered = config.uncovered_pixels();
        if uncovered > 0 {
            tracing::warn!(uncovered, "pixel count is not a multiple of the unit count, trailing pixels are not rendered");
        }

        let frame = Frame::new(config.width, config.height, config.samples_per_pixel, camera);
        let mut renderer = Self {
            ctx: RenderContext { config, device, scene, material },
            units,
            frame,
        };
        renderer.reset_units();
        Ok(renderer)
    }

    fn reset_units(&mut self) {
        let camera = self.frame.camera();
        let config = &self.ctx.config;
        self.units.iter_mut().for_each(|unit| unit.reset(camera, config));
    }

    /// Trace one unit to completion. A no-op on a finished unit.
    pub fn render_work_unit(&mut self, index: usize) {
        let unit = &mut self.units[index];
        unit.render(&self.ctx, self.frame.camera());
        self.frame.publish(unit.range().start, unit.pixels(), unit.color());
    }

    /// Render every unit, in parallel, and publish the result into the frame.
    pub fn render(&mut self) -> RenderStats {
        self.render_with(|_| {})
    }

    /// Like `render`, calling `progress` with each unit index as it finishes.
    pub fn render_with<F>(&mut self, progress: F) -> RenderStats
    where
        F: Fn(usize) + Sync,
    {
        let span = tracing::info_span!("render", units = self.units.len());
        let _enter = span.enter();

        let ctx = &self.ctx;
        let camera = self.frame.camera();
        self.units.par_iter_mut().for_each(|unit| {
            unit.render(ctx, camera);
            progress(unit.index());
        });

        for unit in &self.units {
            self.frame.publish(unit.range().start, unit.pixels(), unit.color());
        }

        let stats = self.stats();
        tracing::info!(%stats, "pass complete");
        stats
    }

    /// Switch cameras. Every unit starts over; no memory is reallocated.
    pub fn update_camera(&mut self, camera: Box<dyn Camera>) {
        self.frame.set_camera(camera);
        self.frame.reset();
        self.reset_units();
        tracing::debug!("camera updated");
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn units(&self) -> &[WorkUnit] {
        &self.units
    }

    pub fn config(&self) -> &RenderConfig {
        &self.ctx.config
    }

    /// Counters summed over all units since the last reset.
    pub fn stats(&self) -> RenderStats {
        self.units.iter().map(|u| u.stats()).sum()
    }

    pub fn device(&self) -> Arc<HostDevice> {
        self.ctx.device.clone()
    }

    /// Release every unit, the scene and the material. Failures abort.
    pub fn destroy(self) {
        device::check("destroy", self.try_destroy())
    }

    pub fn try_destroy(self) -> Result<(), DeviceError> {
        // same order as setup: scene, material, then the units
        let Self { ctx, units, .. } = self;
        let RenderContext { device, scene, material, .. } = ctx;
        scene.free()?;
        material.free()?;
        for unit in units {
            unit.release()?;
        }
        tracing::debug!(
            device_bytes = device.memory_in_use(),
            pinned_bytes = device.pinned_in_use(),
            "renderer destroyed"
        );
        Ok(())
    }
}
