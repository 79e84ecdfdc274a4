use crate::sampling::{cosine_hemisphere_pdf, cosine_sample_hemisphere, uniform_hemisphere_pdf, uniform_sample_hemisphere};
use crate::scene::Hit;
use crate::spectrum::Spectrum;
use crate::{offset_ray_origin, Float, Normal3, Onb, Point2f, Point3f, Ray, Vec3f};
use cgmath::InnerSpace;

/// Where a path met the scene, in world space.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceInteraction {
    pub p: Point3f,
    pub n: Normal3,
    /// Direction back towards where the ray came from.
    pub wo: Vec3f,
}

impl SurfaceInteraction {
    pub fn from_hit(ray: &Ray, hit: &Hit) -> Self {
        Self {
            p: ray.at(hit.distance),
            n: hit.face.normal(ray.dir),
            wo: -ray.dir,
        }
    }

    pub fn spawn_ray(&self, dir: Vec3f) -> Ray {
        Ray::new(offset_ray_origin(self.p, self.n, dir), dir)
    }
}

/// Strategy used to pick scattered directions for diffuse surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplingStrategy {
    Cosine,
    Uniform,
}

/// Importance-sampling distribution over the hemisphere around a normal.
#[derive(Clone, Copy, Debug)]
pub enum SamplingPdf {
    Cosine(Onb),
    Uniform(Onb),
}

impl SamplingPdf {
    pub fn new(strategy: SamplingStrategy, n: Normal3) -> Self {
        let onb = Onb::from_w(n.0);
        match strategy {
            SamplingStrategy::Cosine => SamplingPdf::Cosine(onb),
            SamplingStrategy::Uniform => SamplingPdf::Uniform(onb),
        }
    }

    pub fn generate(&self, u: Point2f) -> Vec3f {
        match self {
            SamplingPdf::Cosine(onb) => onb.local(cosine_sample_hemisphere(u)).normalize(),
            SamplingPdf::Uniform(onb) => onb.local(uniform_sample_hemisphere(u)).normalize(),
        }
    }

    pub fn value(&self, dir: Vec3f) -> Float {
        match self {
            SamplingPdf::Cosine(onb) => {
                let cosine = dir.normalize().dot(onb.w);
                if cosine > 0.0 { cosine_hemisphere_pdf(cosine) } else { 0.0 }
            }
            SamplingPdf::Uniform(onb) => {
                if dir.dot(onb.w) > 0.0 { uniform_hemisphere_pdf() } else { 0.0 }
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ScatterSample {
    pub scattered: Ray,
    pub attenuation: Spectrum,
    /// Density of the distribution the direction was drawn from.
    pub sampling_pdf: Float,
    /// Density of the material's own scattering distribution for that direction.
    pub scattering_pdf: Float,
}

impl ScatterSample {
    /// Attenuation weighted by the importance-sampling correction. `None` when
    /// the sample is degenerate and the path should be absorbed.
    pub fn weighted_attenuation(&self) -> Option<Spectrum> {
        if self.sampling_pdf <= 0.0 {
            None
        } else {
            Some(self.attenuation * (self.scattering_pdf / self.sampling_pdf))
        }
    }
}

pub trait Material: Sync + Send {
    /// Draw a scattered direction for the interaction using the 2D sample `u`.
    /// Returns `None` if the surface absorbs the path outright.
    fn scatter(&self, si: &SurfaceInteraction, u: Point2f) -> Option<ScatterSample>;
}

#[derive(Clone, Copy, Debug)]
pub struct Lambertian {
    pub albedo: Spectrum,
    pub strategy: SamplingStrategy,
}

impl Lambertian {
    pub fn new(albedo: Spectrum) -> Self {
        Self { albedo, strategy: SamplingStrategy::Cosine }
    }

    pub fn with_strategy(albedo: Spectrum, strategy: SamplingStrategy) -> Self {
        Self { albedo, strategy }
    }

    fn scattering_pdf(&self, n: Normal3, wi: Vec3f) -> Float {
        let cosine = n.dot(wi.normalize());
        if cosine < 0.0 { 0.0 } else { cosine * std::f32::consts::FRAC_1_PI }
    }
}

impl Material for Lambertian {
    fn scatter(&self, si: &SurfaceInteraction, u: Point2f) -> Option<ScatterSample> {
        let pdf = SamplingPdf::new(self.strategy, si.n);
        let wi = pdf.generate(u);
        Some(ScatterSample {
            scattered: si.spawn_ray(wi),
            attenuation: self.albedo,
            sampling_pdf: pdf.value(wi),
            scattering_pdf: self.scattering_pdf(si.n, wi),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Face;
    use approx::assert_abs_diff_eq;

    fn floor_interaction() -> SurfaceInteraction {
        let ray = Ray::new(point3f!(0.5, 5, 0.5), vec3f!(0, -1, 0));
        let hit = Hit { face: Face::Y, distance: 4.0 };
        SurfaceInteraction::from_hit(&ray, &hit)
    }

    #[test]
    fn cosine_sampling_cancels_to_albedo() {
        let si = floor_interaction();
        let mat = Lambertian::new(Spectrum::from([0.5, 0.25, 1.0]));
        for &u in &[Point2f::new(0.1, 0.9), Point2f::new(0.7, 0.3), Point2f::new(0.45, 0.6)] {
            let s = mat.scatter(&si, u).unwrap();
            assert!(s.scattered.dir.y > 0.0);
            assert!(s.scattered.origin.y > si.p.y);
            let w = s.weighted_attenuation().unwrap();
            assert_abs_diff_eq!(w[0], 0.5, epsilon = 1e-4);
            assert_abs_diff_eq!(w[1], 0.25, epsilon = 1e-4);
            assert_abs_diff_eq!(w[2], 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn uniform_sampling_weights_by_cosine() {
        let si = floor_interaction();
        let mat = Lambertian::with_strategy(Spectrum::uniform(0.5), SamplingStrategy::Uniform);
        let s = mat.scatter(&si, Point2f::new(0.5, 0.2)).unwrap();
        let cosine = s.scattered.dir.y;
        let w = s.weighted_attenuation().unwrap();
        assert_abs_diff_eq!(w[0], 0.5 * 2.0 * cosine, epsilon = 1e-4);
    }

    #[test]
    fn non_positive_pdf_absorbs() {
        let s = ScatterSample {
            scattered: Ray::default(),
            attenuation: Spectrum::uniform(1.0),
            sampling_pdf: 0.0,
            scattering_pdf: 0.3,
        };
        assert!(s.weighted_attenuation().is_none());
    }

    #[test]
    fn pdf_is_zero_below_surface() {
        let pdf = SamplingPdf::new(SamplingStrategy::Cosine, Normal3::new(0.0, 1.0, 0.0));
        assert_eq!(pdf.value(vec3f!(0, -1, 0)), 0.0);
        let pdf = SamplingPdf::new(SamplingStrategy::Uniform, Normal3::new(0.0, 1.0, 0.0));
        assert_eq!(pdf.value(vec3f!(0.2, -1, 0)), 0.0);
    }
}
