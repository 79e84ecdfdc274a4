use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use wavefront_tracer::camera::PerspectiveCamera;
use wavefront_tracer::config::RenderConfig;
use wavefront_tracer::renderer::Renderer;
use wavefront_tracer::scene::{Heightmap, Intersect};
use wavefront_tracer::{point3f, vec3f, Ray, INFINITY};

fn camera() -> Box<PerspectiveCamera> {
    Box::new(PerspectiveCamera::look_at(point3f!(64, 40, 150), point3f!(64, 0, 64), vec3f!(0, 1, 0), 45.0, 16.0 / 9.0))
}

fn bench(c: &mut Criterion) {
    let terrain = Heightmap::terrain(128, 128, 32);

    let mut group = c.benchmark_group("Terrain");
    group.throughput(Throughput::Elements(1));
    group.bench_function("heightmap intersect", |b| {
        let ray = Ray::new(point3f!(-4, 30, -4), vec3f!(1, -0.2, 1));
        b.iter(|| terrain.intersect(&ray, 0.0, INFINITY))
    });

    let config = RenderConfig::new(160, 90).samples_per_pixel(4).max_depth(4).work_units(8);
    let pixels = config.num_pixels() as u64;
    group.throughput(Throughput::Elements(pixels));
    group.sample_size(10);
    group.bench_function("render pass", |b| {
        let mut renderer = Renderer::prepare(config.clone(), terrain.clone(), camera()).unwrap();
        b.iter(|| {
            renderer.update_camera(camera());
            renderer.render()
        });
        renderer.destroy();
    });
    group.finish();
}

criterion_group!(benches, bench);
criterion_main!(benches);
