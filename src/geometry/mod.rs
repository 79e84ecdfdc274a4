use crate::{Float, Point3f, Vec3f};
use cgmath::prelude::*;
use std::ops::Deref;

/// Distance a spawned ray origin is pushed off the surface it leaves from.
pub const SHADOW_EPSILON: Float = 1e-3;

/// Offset a hit point along the normal, on the side the outgoing direction points to.
pub fn offset_ray_origin(p: Point3f, n: Normal3, dir: Vec3f) -> Point3f {
    let mut offset = SHADOW_EPSILON * n.0;
    if dir.dot(n.0) < 0.0 {
        offset = -offset;
    }
    p + offset
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3f,
    pub dir: Vec3f,
}

impl Ray {
    pub fn new(origin: Point3f, dir: Vec3f) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: Float) -> Point3f {
        self.origin + (self.dir * t)
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Point3f::origin(),
            dir: Vec3f::unit_z(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Normal3(pub Vec3f);

impl Normal3 {
    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Self(Vec3f::new(x, y, z))
    }
}

impl Deref for Normal3 {
    type Target = Vec3f;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Orthonormal basis built around a single direction, which becomes the local +z axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Onb {
    pub u: Vec3f,
    pub v: Vec3f,
    pub w: Vec3f,
}

impl Onb {
    pub fn from_w(n: Vec3f) -> Self {
        let w = n.normalize();
        let a = if w.x.abs() > 0.9 { Vec3f::unit_y() } else { Vec3f::unit_x() };
        let v = w.cross(a).normalize();
        let u = w.cross(v);
        Self { u, v, w }
    }

    /// Map a vector expressed in this basis back to world space.
    pub fn local(&self, a: Vec3f) -> Vec3f {
        a.x * self.u + a.y * self.v + a.z * self.w
    }
}
