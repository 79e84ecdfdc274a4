use std::ops::Range;

use crate::camera::Camera;
use crate::spectrum::Spectrum;

/// Sample bookkeeping for one pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pixel {
    /// Samples whose paths have completed.
    pub done: u32,
    /// Samples ever started, completed or still in flight.
    pub samples: u32,
}

/// The published image state: per-pixel counters, accumulated color sums and
/// the camera the image is being rendered from.
pub struct Frame {
    width: usize,
    height: usize,
    samples_per_pixel: u32,
    pixels: Vec<Pixel>,
    accumulated: Vec<Spectrum>,
    camera: Box<dyn Camera>,
}

impl Frame {
    pub fn new(width: usize, height: usize, samples_per_pixel: u32, camera: Box<dyn Camera>) -> Self {
        Self {
            width,
            height,
            samples_per_pixel,
            pixels: vec![Pixel::default(); width * height],
            accumulated: vec![Spectrum::black(); width * height],
            camera,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn samples_per_pixel(&self) -> u32 {
        self.samples_per_pixel
    }

    pub fn camera(&self) -> &dyn Camera {
        self.camera.as_ref()
    }

    pub(crate) fn set_camera(&mut self, camera: Box<dyn Camera>) {
        self.camera = camera;
    }

    /// Forget every sample, ahead of re-rendering from a new camera.
    pub(crate) fn reset(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = Pixel::default());
        self.accumulated.iter_mut().for_each(|c| *c = Spectrum::black());
    }

    /// Copy a work unit's state for the pixel range starting at `start`.
    pub(crate) fn publish(&mut self, start: usize, pixels: &[Pixel], accumulated: &[Spectrum]) {
        let range = start..start + pixels.len();
        self.pixels[range.clone()].copy_from_slice(pixels);
        self.accumulated[range].copy_from_slice(accumulated);
    }

    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn pixel(&self, x: usize, y: usize) -> Pixel {
        self.pixels[self.index(x, y)]
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Sum of every completed path's contribution to the pixel.
    pub fn accumulated(&self, x: usize, y: usize) -> Spectrum {
        self.accumulated[self.index(x, y)]
    }

    /// Mean color over the pixel's completed samples, black if it has none.
    pub fn color(&self, x: usize, y: usize) -> Spectrum {
        let i = self.index(x, y);
        mean(self.accumulated[i], self.pixels[i])
    }

    /// Row-major mean colors, ready for tone mapping.
    pub fn colors(&self) -> Vec<Spectrum> {
        self.accumulated
            .iter()
            .zip(&self.pixels)
            .map(|(&c, &p)| mean(c, p))
            .collect()
    }

    /// Display-ready 8-bit sRGB image. Pixels without samples are black.
    pub fn image(&self) -> image::RgbImage {
        crate::imageio::frame_to_image(self)
    }

    /// Pixels with at least one started sample.
    pub fn covered(&self) -> Range<usize> {
        let end = self.pixels.iter().rposition(|p| p.samples > 0).map_or(0, |i| i + 1);
        0..end
    }

    pub fn is_complete(&self) -> bool {
        self.pixels[self.covered()].iter().all(|p| p.done == self.samples_per_pixel)
    }
}

fn mean(sum: Spectrum, pixel: Pixel) -> Spectrum {
    if pixel.done == 0 {
        Spectrum::black()
    } else {
        sum / pixel.done as crate::Float
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveCamera;

    fn frame() -> Frame {
        let camera = PerspectiveCamera::look_at(point3f!(0, 0, 0), point3f!(0, 0, -1), vec3f!(0, 1, 0), 60.0, 1.0);
        Frame::new(3, 2, 2, Box::new(camera))
    }

    #[test]
    fn color_is_mean_of_completed_samples() {
        let mut f = frame();
        f.publish(
            1,
            &[Pixel { done: 2, samples: 2 }, Pixel { done: 0, samples: 1 }],
            &[Spectrum::uniform(3.0), Spectrum::uniform(1.0)],
        );
        assert_eq!(f.color(1, 0), Spectrum::uniform(1.5));
        assert_eq!(f.color(2, 0), Spectrum::black());
        assert_eq!(f.covered(), 0..3);
        assert!(!f.is_complete());
    }

    #[test]
    fn reset_clears_counters() {
        let mut f = frame();
        f.publish(0, &[Pixel { done: 2, samples: 2 }], &[Spectrum::uniform(1.0)]);
        f.reset();
        assert_eq!(f.pixel(0, 0), Pixel::default());
        assert_eq!(f.accumulated(0, 0), Spectrum::black());
        assert_eq!(f.covered(), 0..0);
    }
}
