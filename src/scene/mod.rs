use crate::{Float, Normal3, Ray, Vec3f};

pub mod heightmap;

pub use heightmap::Heightmap;

/// Axis of the voxel boundary a ray crossed when it hit the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    X,
    Y,
    Z,
}

impl Face {
    pub fn axis(self) -> usize {
        match self {
            Face::X => 0,
            Face::Y => 1,
            Face::Z => 2,
        }
    }

    pub fn from_axis(axis: usize) -> Self {
        match axis {
            0 => Face::X,
            1 => Face::Y,
            _ => Face::Z,
        }
    }

    /// The outward normal of the face: along the face's axis, facing back
    /// against the direction the ray was travelling.
    pub fn normal(self, dir: Vec3f) -> Normal3 {
        let mut n = Vec3f::new(0.0, 0.0, 0.0);
        let axis = self.axis();
        n[axis] = if dir[axis] > 0.0 { -1.0 } else { 1.0 };
        Normal3(n)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub face: Face,
    pub distance: Float,
}

/// First-hit query against scene geometry. A miss is a normal outcome.
pub trait Intersect: Sync + Send {
    fn intersect(&self, ray: &Ray, t_min: Float, t_max: Float) -> Option<Hit>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_normal_opposes_direction() {
        assert_eq!(Face::Y.normal(vec3f!(0.2, -1, 0)), Normal3::new(0.0, 1.0, 0.0));
        assert_eq!(Face::X.normal(vec3f!(1, 0.5, 0)), Normal3::new(-1.0, 0.0, 0.0));
        assert_eq!(Face::Z.normal(vec3f!(0, 0, -1)), Normal3::new(0.0, 0.0, 1.0));
    }
}
