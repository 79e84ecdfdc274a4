#[macro_use] pub mod macros; // must stay at the top
pub mod geometry;
pub mod spectrum;
pub mod sampling;
pub mod random;
pub mod camera;
pub mod scene;
pub mod material;
pub mod device;
pub mod config;
pub mod frame;
pub mod renderer;
pub mod imageio;

pub use geometry::*;
pub use spectrum::Spectrum;

use cgmath::{Point2, Point3, Vector3};

pub type Float = f32;

pub type Point2f = Point2<Float>;
pub type Point3f = Point3<Float>;
pub type Vec3f = Vector3<Float>;

pub const INFINITY: Float = std::f32::INFINITY;

/// Sky color seen by a ray that leaves the scene.
pub fn background(dir: &Vec3f) -> Spectrum {
    // scale so t is between 0.0 and 1.0
    let t = 0.5 * (dir.y + 1.0);
    // linear interpolation based on t
    Spectrum::lerp(t, Spectrum::uniform(1.0), Spectrum::from([0.5, 0.7, 1.0]))
}
