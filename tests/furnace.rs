use approx::assert_abs_diff_eq;

use wavefront_tracer::camera::OrthographicCamera;
use wavefront_tracer::config::{RenderConfig, Sky};
use wavefront_tracer::device::DeviceDesc;
use wavefront_tracer::material::SamplingStrategy;
use wavefront_tracer::renderer::Renderer;
use wavefront_tracer::scene::Heightmap;
use wavefront_tracer::{point3f, vec3f, Spectrum};

/// A flat floor of albedo 0.5 under a sky of constant radiance 1, seen from
/// straight above. Every path hits the floor once and escapes, so each pixel
/// converges to exactly the albedo.
fn render_furnace(sampling: SamplingStrategy, ns: u32, max_depth: u32) -> Vec<Spectrum> {
    let config = RenderConfig::new(4, 4)
        .samples_per_pixel(ns)
        .max_depth(max_depth)
        .work_units(2)
        .albedo(Spectrum::uniform(0.5))
        .sampling(sampling)
        .sky(Sky::Uniform(Spectrum::uniform(1.0)))
        .seed(11)
        .device(DeviceDesc { threads: 2, ..DeviceDesc::default() });
    let camera = OrthographicCamera::look_at(point3f!(4, 5, 4), point3f!(4, 0, 4), vec3f!(0, 0, -1), 4.0, 4.0);

    let mut renderer = Renderer::prepare(config, Heightmap::flat(8, 8, 1), Box::new(camera)).unwrap();
    let stats = renderer.render();
    assert_eq!(stats.absorbed, 0);
    assert_eq!(stats.cut_off, 0);

    let colors = renderer.frame().colors();
    renderer.destroy();
    colors
}

#[test]
fn furnace_cosine_sampling() {
    for s in render_furnace(SamplingStrategy::Cosine, 8, 1) {
        for comp in s.into_array().iter() {
            // cosine sampling cancels the cosine term, so every sample is the same
            assert_abs_diff_eq!(*comp, 0.5, epsilon = 1e-4);
        }
    }
}

#[test]
fn furnace_deeper_paths_change_nothing() {
    for s in render_furnace(SamplingStrategy::Cosine, 4, 6) {
        for comp in s.into_array().iter() {
            assert_abs_diff_eq!(*comp, 0.5, epsilon = 1e-4);
        }
    }
}

#[test]
fn furnace_uniform_sampling() {
    let img = render_furnace(SamplingStrategy::Uniform, 64, 1);
    let n = img.len() as f32;
    let mean: Spectrum = img.iter().copied().sum::<Spectrum>() / n;

    // TODO: could use an actual statistical test (as in Nori)
    for s in &img {
        for comp in s.into_array().iter() {
            assert_abs_diff_eq!(*comp, 0.5, epsilon = 0.2);
        }
    }
    for comp in mean.into_array().iter() {
        assert_abs_diff_eq!(*comp, 0.5, epsilon = 0.04);
    }
}
