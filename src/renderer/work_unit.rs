use std::ops::Range;

use rand::Rng as _;

use crate::camera::Camera;
use crate::config::RenderConfig;
use crate::device::{self, DeviceBuffer, DeviceError, DualBuffer, HostDevice, Stream};
use crate::frame::Pixel;
use crate::random::{host_rng, Rng};
use crate::renderer::compaction;
use crate::renderer::kernels::{ColorRecord, IntersectKernel, ShadeKernel};
use crate::renderer::stats::RenderStats;
use crate::renderer::RenderContext;
use crate::scene::Hit;
use crate::spectrum::Spectrum;
use crate::{Float, Ray};

/// Bookkeeping for the path currently occupying a ray slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Pixel within the owning unit's range.
    pub pixel_id: usize,
    /// Scatter events so far.
    pub depth: u32,
    /// Product of the attenuations along the path.
    pub not_absorbed: Spectrum,
    /// Set once the path has finished; the slot is then free or idle.
    pub done: bool,
}

impl Sample {
    pub fn new(pixel_id: usize) -> Self {
        Self {
            pixel_id,
            depth: 0,
            not_absorbed: Spectrum::uniform(1.0),
            done: false,
        }
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Camera ray through a random point of `pixel`.
pub fn jittered_ray(camera: &dyn Camera, pixel: usize, width: usize, height: usize, rng: &mut Rng) -> Ray {
    let x = (pixel % width) as Float;
    let y = (pixel / width) as Float;
    let u = (x + rng.gen::<Float>()) / width as Float;
    let v = (y + rng.gen::<Float>()) / height as Float;
    camera.generate_ray(u, v)
}

/// A contiguous range of pixels traced together, one ray slot per pixel, on
/// its own stream.
pub struct WorkUnit {
    index: usize,
    start_idx: usize,
    end_idx: usize,

    rays: DualBuffer<Ray>,
    hits: DeviceBuffer<Option<Hit>>,
    records: DualBuffer<ColorRecord>,
    stream: Stream,

    samples: Vec<Sample>,
    pixels: Vec<Pixel>,
    color: Vec<Spectrum>,
    pixel_idx: Vec<usize>,
    freed: Vec<usize>,

    rng: Rng,
    bounces: u64,
    stats: RenderStats,
}

impl WorkUnit {
    /// Allocate the unit's buffers and stream. Call `reset` before tracing.
    pub fn new(device: &HostDevice, index: usize, range: Range<usize>, seed: u64) -> Result<Self, DeviceError> {
        let len = range.len();
        let rays = device.alloc_dual(len)?;
        let hits = device.alloc(len)?;
        let records = device.alloc_dual(len)?;
        let stream = device.create_stream()?;

        Ok(Self {
            index,
            start_idx: range.start,
            end_idx: range.end,
            rays,
            hits,
            records,
            stream,
            samples: vec![Sample::default(); len],
            pixels: vec![Pixel::default(); len],
            color: vec![Spectrum::black(); len],
            pixel_idx: Vec::with_capacity(len),
            freed: Vec::with_capacity(len),
            rng: host_rng(seed, index),
            bounces: 0,
            stats: RenderStats::default(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.end_idx - self.start_idx
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frame pixels this unit owns.
    pub fn range(&self) -> Range<usize> {
        self.start_idx..self.end_idx
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn color(&self) -> &[Spectrum] {
        &self.color
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn is_done(&self, ns: u32) -> bool {
        compaction::all_done(&self.pixels, ns)
    }

    /// Start over with one fresh sample per pixel. Buffers are reused.
    pub fn reset(&mut self, camera: &dyn Camera, config: &RenderConfig) {
        self.rng = host_rng(config.seed, self.index);
        self.bounces = 0;
        self.stats = RenderStats::default();

        let mut rays = self.rays.host();
        for slot in 0..self.len() {
            self.samples[slot] = Sample::new(slot);
            self.pixels[slot] = Pixel { done: 0, samples: 1 };
            self.color[slot] = Spectrum::black();
            rays[slot] = jittered_ray(camera, self.start_idx + slot, config.width, config.height, &mut self.rng);
        }
    }

    /// Trace until every pixel of the unit has its samples. Does nothing on a
    /// finished unit.
    pub fn render(&mut self, ctx: &RenderContext, camera: &dyn Camera) {
        let ns = ctx.config.samples_per_pixel;
        let span = tracing::debug_span!("work_unit", unit = self.index);
        let _enter = span.enter();

        while !self.is_done(ns) {
            self.trace_bounce(ctx);
            self.compact(camera, &ctx.config);
        }

        tracing::debug!(bounces = self.stats.bounces, regenerated = self.stats.regenerated, "unit complete");
    }

    /// Issue one bounce on the unit's stream and wait for its results.
    fn trace_bounce(&mut self, ctx: &RenderContext) {
        let stream = &self.stream;
        device::check("copy rays to device", self.rays.stage_to_device(stream));
        device::check(
            "launch intersect",
            ctx.device.launch(stream, IntersectKernel {
                scene: ctx.scene.ptr(),
                rays: self.rays.device_ptr(),
                hits: self.hits.ptr(),
            }),
        );
        device::check(
            "launch shade",
            ctx.device.launch(stream, ShadeKernel {
                material: ctx.material.ptr(),
                sky: ctx.config.sky,
                rays: self.rays.device_ptr(),
                hits: self.hits.ptr(),
                records: self.records.device_ptr(),
                seed: ctx.config.seed,
                unit: self.index,
                bounce: self.bounces,
            }),
        );
        device::check("copy results to host", self.records.stage_to_host(stream));
        device::check("synchronize", stream.synchronize());

        self.bounces += 1;
        self.stats.bounces += 1;
        self.stats.rays_traced += self.len() as u64;
        tracing::trace!(bounce = self.bounces, "bounce traced");
    }

    /// Fold the last bounce into the unit and refill freed slots.
    fn compact(&mut self, camera: &dyn Camera, config: &RenderConfig) {
        let mut rays = self.rays.host();
        let records = self.records.host();
        compaction::retire(
            &mut self.samples,
            &mut rays,
            &records,
            &mut self.pixels,
            &mut self.color,
            config.max_depth,
            &mut self.freed,
            &mut self.stats,
        );

        if compaction::all_done(&self.pixels, config.samples_per_pixel) {
            return;
        }

        let start = self.start_idx;
        let samples = &mut self.samples;
        let rng = &mut self.rng;
        let regenerated = compaction::replenish(
            &mut self.pixels,
            &mut self.pixel_idx,
            &self.freed,
            config.samples_per_pixel,
            |slot, pixel| {
                samples[slot] = Sample::new(pixel);
                rays[slot] = jittered_ray(camera, start + pixel, config.width, config.height, rng);
            },
        );
        self.stats.regenerated += regenerated as u64;
    }

    /// Free buffers in allocation order, then stop the stream.
    pub fn release(self) -> Result<(), DeviceError> {
        let Self { rays, hits, records, stream, .. } = self;
        rays.free()?;
        hits.free()?;
        records.free()?;
        stream.destroy()
    }
}
