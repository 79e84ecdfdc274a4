use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use wavefront_tracer::camera::{Camera, PerspectiveCamera};
use wavefront_tracer::config::{RenderConfig, Sky};
use wavefront_tracer::device::DeviceDesc;
use wavefront_tracer::imageio;
use wavefront_tracer::material::SamplingStrategy;
use wavefront_tracer::renderer::Renderer;
use wavefront_tracer::scene::Heightmap;
use wavefront_tracer::{point3f, vec3f, Float, Spectrum};

#[derive(Parser, Debug)]
#[command(name = "render", about = "Render a procedural voxel terrain")]
struct Args {
    #[arg(long, default_value_t = 640)]
    width: usize,
    #[arg(long, default_value_t = 360)]
    height: usize,
    /// Samples per pixel
    #[arg(long, default_value_t = 32)]
    spp: u32,
    #[arg(long, default_value_t = 8)]
    max_depth: u32,
    #[arg(long, default_value_t = 8)]
    units: usize,
    #[arg(long, default_value_t = 0.6)]
    albedo: Float,
    /// Sample scattered directions uniformly instead of by cosine
    #[arg(long)]
    uniform: bool,
    /// Constant sky radiance instead of the gradient
    #[arg(long)]
    sky: Option<Float>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Kernel worker threads, 0 for one per core
    #[arg(long, default_value_t = 0)]
    threads: usize,
    /// Device memory budget in MiB
    #[arg(long, default_value_t = 1024)]
    memory_mib: usize,
    /// Terrain size along x and z, in voxels
    #[arg(long, default_value_t = 128)]
    terrain: usize,
    /// Render this many frames while orbiting the camera
    #[arg(long, default_value_t = 1)]
    frames: usize,
    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,
}

fn orbit_camera(args: &Args, frame: usize) -> Box<dyn Camera> {
    let size = args.terrain as Float;
    let center = point3f!(size / 2.0, 0, size / 2.0);
    let angle = std::f32::consts::TAU * frame as Float / args.frames as Float;
    let radius = 0.8 * size;
    let from = point3f!(center.x + radius * angle.sin(), size * 0.45, center.z + radius * angle.cos());
    let aspect = args.width as Float / args.height as Float;
    Box::new(PerspectiveCamera::look_at(from, center, vec3f!(0, 1, 0), 45.0, aspect))
}

fn output_path(args: &Args, frame: usize) -> PathBuf {
    if args.frames == 1 {
        return args.output.clone();
    }
    let stem = args.output.file_stem().and_then(|s| s.to_str()).unwrap_or("render");
    let ext = args.output.extension().and_then(|s| s.to_str()).unwrap_or("png");
    args.output.with_file_name(format!("{}_{:03}.{}", stem, frame, ext))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    anyhow::ensure!(args.frames > 0, "need at least one frame");

    let config = RenderConfig::new(args.width, args.height)
        .samples_per_pixel(args.spp)
        .max_depth(args.max_depth)
        .work_units(args.units)
        .albedo(Spectrum::uniform(args.albedo))
        .sampling(if args.uniform { SamplingStrategy::Uniform } else { SamplingStrategy::Cosine })
        .sky(args.sky.map_or(Sky::Gradient, |s| Sky::Uniform(Spectrum::uniform(s))))
        .seed(args.seed)
        .device(DeviceDesc {
            memory_bytes: args.memory_mib << 20,
            threads: args.threads,
            ..DeviceDesc::default()
        });

    let scene = Heightmap::terrain(args.terrain, args.terrain, (args.terrain / 4).max(1) as u32);
    let mut renderer = Renderer::try_prepare(config, scene, orbit_camera(&args, 0))
        .context("failed to set up renderer")?;

    let style = ProgressStyle::default_bar()
        .template("{msg:12.cyan.bold} [{bar:40.green/white}] {pos:>4}/{len:4} ({elapsed}|{eta})")?
        .progress_chars("█▓▒░  ");

    for frame in 0..args.frames {
        if frame > 0 {
            renderer.update_camera(orbit_camera(&args, frame));
        }

        let progress = ProgressBar::new(args.units as u64);
        progress.set_style(style.clone());
        progress.set_message(format!("frame {}", frame));
        let stats = renderer.render_with(|_| progress.inc(1));
        progress.finish_and_clear();

        tracing::info!(frame, %stats, "frame rendered");
        let path = output_path(&args, frame);
        imageio::write_frame(renderer.frame(), &path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    renderer.try_destroy()?;
    Ok(())
}
