use std::sync::Arc;

use rand::Rng as _;
use rayon::prelude::*;

use crate::config::Sky;
use crate::device::{DevicePtr, Kernel};
use crate::material::{Material, SurfaceInteraction};
use crate::random::kernel_rng;
use crate::scene::{Hit, Intersect};
use crate::spectrum::Spectrum;
use crate::{Float, Point2f, Ray, INFINITY};

/// How one bounce ended for a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Hit a surface and continues along `ray`.
    Scattered,
    /// Missed the scene; `color` is the sky radiance.
    Escaped,
    /// Degenerate scatter or absorbing surface; `color` is black.
    Absorbed,
}

/// Result of one shading step, copied back to the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorRecord {
    /// The ray for the next bounce, only meaningful when scattered.
    pub ray: Ray,
    /// Emitted radiance when the path is done, otherwise the bounce's attenuation.
    pub color: Spectrum,
    pub outcome: Outcome,
}

impl ColorRecord {
    pub fn scattered(ray: Ray, attenuation: Spectrum) -> Self {
        Self { ray, color: attenuation, outcome: Outcome::Scattered }
    }

    pub fn escaped(ray: Ray, radiance: Spectrum) -> Self {
        Self { ray, color: radiance, outcome: Outcome::Escaped }
    }

    pub fn absorbed(ray: Ray) -> Self {
        Self { ray, color: Spectrum::black(), outcome: Outcome::Absorbed }
    }

    pub fn done(&self) -> bool {
        self.outcome != Outcome::Scattered
    }
}

impl Default for ColorRecord {
    fn default() -> Self {
        Self::absorbed(Ray::default())
    }
}

/// First hit for every ray slot of a work unit.
pub struct IntersectKernel<S> {
    pub scene: Arc<S>,
    pub rays: DevicePtr<Ray>,
    pub hits: DevicePtr<Option<Hit>>,
}

impl<S: Intersect + 'static> Kernel for IntersectKernel<S> {
    fn name(&self) -> &'static str {
        "intersect"
    }

    fn run(self) {
        let rays = self.rays.lock();
        let mut hits = self.hits.lock();
        let scene = &*self.scene;
        hits.par_iter_mut()
            .zip(rays.par_iter())
            .for_each(|(hit, ray)| *hit = scene.intersect(ray, 0.0, INFINITY));
    }
}

/// Scatter or terminate every path given its hit record.
pub struct ShadeKernel<M> {
    pub material: Arc<M>,
    pub sky: Sky,
    pub rays: DevicePtr<Ray>,
    pub hits: DevicePtr<Option<Hit>>,
    pub records: DevicePtr<ColorRecord>,
    pub seed: u64,
    pub unit: usize,
    /// Bounce counter of the launching unit; keys the per-thread random streams.
    pub bounce: u64,
}

impl<M: Material + 'static> Kernel for ShadeKernel<M> {
    fn name(&self) -> &'static str {
        "shade"
    }

    fn run(self) {
        let rays = self.rays.lock();
        let hits = self.hits.lock();
        let mut records = self.records.lock();
        let material = &*self.material;
        let sky = self.sky;
        let (seed, unit, bounce) = (self.seed, self.unit, self.bounce);

        records.par_iter_mut()
            .zip(rays.par_iter().zip(hits.par_iter()))
            .enumerate()
            .for_each(|(thread, (record, (ray, hit)))| {
                *record = match hit {
                    None => ColorRecord::escaped(*ray, sky.radiance(&ray.dir)),
                    Some(hit) => {
                        let mut rng = kernel_rng(seed, unit, bounce, thread);
                        let si = SurfaceInteraction::from_hit(ray, hit);
                        let u = Point2f::new(rng.gen::<Float>(), rng.gen::<Float>());
                        material
                            .scatter(&si, u)
                            .and_then(|s| s.weighted_attenuation().map(|w| (s.scattered, w)))
                            .map_or_else(
                                || ColorRecord::absorbed(*ray),
                                |(scattered, w)| ColorRecord::scattered(scattered, w),
                            )
                    }
                };
            });
    }
}
