use thiserror::Error;

use crate::device::DeviceDesc;
use crate::material::SamplingStrategy;
use crate::spectrum::Spectrum;
use crate::{background, Float, Vec3f};

/// What a path sees when it leaves the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sky {
    /// White at the horizon fading to light blue straight up.
    Gradient,
    Uniform(Spectrum),
}

impl Sky {
    pub fn radiance(&self, dir: &Vec3f) -> Spectrum {
        match self {
            Sky::Gradient => background(dir),
            Sky::Uniform(s) => *s,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("image must be at least 1x1, got {width}x{height}")]
    EmptyImage { width: usize, height: usize },

    #[error("samples per pixel must be at least 1")]
    NoSamples,

    #[error("work unit count must be between 1 and the pixel count {pixels}, got {units}")]
    UnitCount { units: usize, pixels: usize },

    #[error("albedo components must be finite and within [0, 1], got {0:?}")]
    Albedo([Float; 3]),

    #[error("sky radiance must be finite and non-negative, got {0:?}")]
    Sky([Float; 3]),
}

/// Everything fixed at setup. Only the camera may change afterwards.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    /// Target number of completed samples per pixel.
    pub samples_per_pixel: u32,
    /// Maximum number of scatter events along a path.
    pub max_depth: u32,
    pub work_units: usize,
    pub albedo: Spectrum,
    pub sampling: SamplingStrategy,
    pub sky: Sky,
    pub seed: u64,
    pub device: DeviceDesc,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            samples_per_pixel: 16,
            max_depth: 8,
            work_units: 4,
            albedo: Spectrum::uniform(0.5),
            sampling: SamplingStrategy::Cosine,
            sky: Sky::Gradient,
            seed: 0,
            device: DeviceDesc::default(),
        }
    }
}

impl RenderConfig {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, ..Self::default() }
    }

    pub fn samples_per_pixel(mut self, ns: u32) -> Self {
        self.samples_per_pixel = ns;
        self
    }

    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn work_units(mut self, units: usize) -> Self {
        self.work_units = units;
        self
    }

    pub fn albedo(mut self, albedo: Spectrum) -> Self {
        self.albedo = albedo;
        self
    }

    pub fn sampling(mut self, sampling: SamplingStrategy) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn sky(mut self, sky: Sky) -> Self {
        self.sky = sky;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn device(mut self, device: DeviceDesc) -> Self {
        self.device = device;
        self
    }

    pub fn num_pixels(&self) -> usize {
        self.width * self.height
    }

    /// Pixels per work unit. Remainder pixels past `unit_len * work_units` are not rendered.
    pub fn unit_len(&self) -> usize {
        self.num_pixels() / self.work_units
    }

    pub fn uncovered_pixels(&self) -> usize {
        self.num_pixels() - self.unit_len() * self.work_units
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyImage { width: self.width, height: self.height });
        }
        if self.samples_per_pixel == 0 {
            return Err(ConfigError::NoSamples);
        }
        if self.work_units == 0 || self.work_units > self.num_pixels() {
            return Err(ConfigError::UnitCount { units: self.work_units, pixels: self.num_pixels() });
        }
        let albedo = self.albedo.into_array();
        if albedo.iter().any(|c| !c.is_finite() || *c < 0.0 || *c > 1.0) {
            return Err(ConfigError::Albedo(albedo));
        }
        if let Sky::Uniform(s) = self.sky {
            let s = s.into_array();
            if s.iter().any(|c| !c.is_finite() || *c < 0.0) {
                return Err(ConfigError::Sky(s));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(RenderConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            RenderConfig::new(0, 4).validate(),
            Err(ConfigError::EmptyImage { width: 0, height: 4 })
        );
        assert_eq!(RenderConfig::new(2, 2).samples_per_pixel(0).validate(), Err(ConfigError::NoSamples));
        assert_eq!(
            RenderConfig::new(2, 2).work_units(5).validate(),
            Err(ConfigError::UnitCount { units: 5, pixels: 4 })
        );
        assert_eq!(
            RenderConfig::new(2, 2).work_units(1).albedo(Spectrum::from([0.5, 1.5, 0.0])).validate(),
            Err(ConfigError::Albedo([0.5, 1.5, 0.0]))
        );
    }

    #[test]
    fn partition_remainder() {
        let config = RenderConfig::new(5, 2).work_units(3);
        assert_eq!(config.unit_len(), 3);
        assert_eq!(config.uncovered_pixels(), 1);
    }
}
