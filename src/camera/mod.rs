use crate::{Float, Point3f, Ray, Vec3f};
use cgmath::InnerSpace;

/// Maps a normalized raster position to a primary ray.
///
/// `u` runs left to right and `v` top to bottom, both in [0, 1], matching the
/// row-major pixel order of the frame.
pub trait Camera: Sync + Send {
    fn generate_ray(&self, u: Float, v: Float) -> Ray;
}

/// Orientation shared by the camera models: `w` points away from the scene.
#[derive(Clone, Copy, Debug)]
struct Frame {
    u: Vec3f,
    v: Vec3f,
    w: Vec3f,
}

impl Frame {
    fn look_at(lookfrom: Point3f, lookat: Point3f, up: Vec3f) -> Self {
        let w = (lookfrom - lookat).normalize();
        let u = up.cross(w).normalize();
        let v = w.cross(u);
        Self { u, v, w }
    }
}

#[derive(Clone, Debug)]
pub struct PerspectiveCamera {
    origin: Point3f,
    upper_left_corner: Point3f,
    horizontal: Vec3f,
    vertical: Vec3f,
}

impl PerspectiveCamera {
    /// `vfov` is the vertical field of view in degrees.
    pub fn look_at(lookfrom: Point3f, lookat: Point3f, up: Vec3f, vfov: Float, aspect: Float) -> Self {
        let half_height = (vfov.to_radians() / 2.0).tan();
        let half_width = aspect * half_height;
        let Frame { u, v, w } = Frame::look_at(lookfrom, lookat, up);

        let upper_left_corner = lookfrom - half_width * u + half_height * v - w;
        Self {
            origin: lookfrom,
            upper_left_corner,
            horizontal: 2.0 * half_width * u,
            vertical: 2.0 * half_height * v,
        }
    }
}

impl Camera for PerspectiveCamera {
    fn generate_ray(&self, u: Float, v: Float) -> Ray {
        let target = self.upper_left_corner + u * self.horizontal - v * self.vertical;
        Ray::new(self.origin, (target - self.origin).normalize())
    }
}

/// Parallel projection: every ray shares one direction, origins span a
/// `width` by `height` window centered on `lookfrom`.
#[derive(Clone, Debug)]
pub struct OrthographicCamera {
    upper_left_corner: Point3f,
    horizontal: Vec3f,
    vertical: Vec3f,
    dir: Vec3f,
}

impl OrthographicCamera {
    pub fn look_at(lookfrom: Point3f, lookat: Point3f, up: Vec3f, width: Float, height: Float) -> Self {
        let Frame { u, v, w } = Frame::look_at(lookfrom, lookat, up);
        let upper_left_corner = lookfrom - 0.5 * width * u + 0.5 * height * v;
        Self {
            upper_left_corner,
            horizontal: width * u,
            vertical: height * v,
            dir: -w,
        }
    }
}

impl Camera for OrthographicCamera {
    fn generate_ray(&self, u: Float, v: Float) -> Ray {
        let origin = self.upper_left_corner + u * self.horizontal - v * self.vertical;
        Ray::new(origin, self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn perspective_center_ray_looks_at_target() {
        let cam = PerspectiveCamera::look_at(
            point3f!(0, 0, 0),
            point3f!(0, 0, -1),
            vec3f!(0, 1, 0),
            90.0,
            2.0,
        );
        let ray = cam.generate_ray(0.5, 0.5);
        assert_abs_diff_eq!(ray.dir.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ray.dir.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ray.dir.z, -1.0, epsilon = 1e-6);

        // v grows downward
        let top = cam.generate_ray(0.5, 0.0);
        assert!(top.dir.y > 0.0);
    }

    #[test]
    fn orthographic_rays_are_parallel() {
        let cam = OrthographicCamera::look_at(
            point3f!(0, 10, 0),
            point3f!(0, 0, 0),
            vec3f!(0, 0, -1),
            4.0,
            4.0,
        );
        let a = cam.generate_ray(0.0, 0.0);
        let b = cam.generate_ray(1.0, 1.0);
        assert_eq!(a.dir, b.dir);
        assert_abs_diff_eq!(a.dir.y, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!((a.origin - b.origin).magnitude(), (32.0 as Float).sqrt(), epsilon = 1e-5);
    }
}
