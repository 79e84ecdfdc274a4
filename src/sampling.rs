use crate::{Point2f, Vec3f, Float};
use std::f32;

pub fn concentric_sample_disk(u: Point2f) -> Point2f {
    // map sample from [0, 1] to [-1, 1]
    let ox = 2.0 * u.x - 1.0;
    let oy = 2.0 * u.y - 1.0;
    if ox == 0.0 && oy == 0.0 {
        return Point2f::new(0.0, 0.0);
    }

    let (r, theta) = if ox.abs() > oy.abs() {
        (ox, f32::consts::FRAC_PI_4 * (oy / ox))
    } else {
        (oy, f32::consts::FRAC_PI_2 - f32::consts::FRAC_PI_4 * (ox / oy))
    };

    Point2f::new(r * theta.cos(), r * theta.sin())
}

pub fn cosine_sample_hemisphere(u: Point2f) -> Vec3f {
    let d = concentric_sample_disk(u);
    let z = Float::sqrt(Float::max(0.0, 1.0 - d.x * d.x - d.y * d.y));
    Vec3f::new(d.x, d.y, z)
}

pub fn cosine_hemisphere_pdf(cos_theta: Float) -> Float {
    cos_theta * f32::consts::FRAC_1_PI
}

pub fn uniform_sample_hemisphere(u: Point2f) -> Vec3f {
    let z = u.x;
    let r = Float::sqrt(Float::max(0.0, 1.0 - z * z));
    let phi = 2.0 * f32::consts::PI * u.y;
    Vec3f::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn uniform_hemisphere_pdf() -> Float {
    0.5 * f32::consts::FRAC_1_PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hemisphere_samples_are_unit_and_upward() {
        let n = 16;
        for i in 0..n {
            for j in 0..n {
                let u = Point2f::new((i as Float + 0.5) / n as Float, (j as Float + 0.5) / n as Float);
                let c = cosine_sample_hemisphere(u);
                assert_abs_diff_eq!(c.magnitude(), 1.0, epsilon = 1e-5);
                assert!(c.z >= 0.0);

                let s = uniform_sample_hemisphere(u);
                assert_abs_diff_eq!(s.magnitude(), 1.0, epsilon = 1e-5);
                assert!(s.z >= 0.0);
            }
        }
    }

    #[test]
    fn disk_center_maps_to_origin() {
        assert_eq!(concentric_sample_disk(Point2f::new(0.5, 0.5)), Point2f::new(0.0, 0.0));
    }
}
