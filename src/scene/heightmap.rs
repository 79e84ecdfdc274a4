use crate::scene::{Face, Hit, Intersect};
use crate::{Float, Ray, INFINITY};

/// Voxel columns on an `x`/`z` grid. Column `(x, z)` is solid for
/// `0 <= y < height(x, z)`, every voxel being a unit cube.
#[derive(Clone, Debug, PartialEq)]
pub struct Heightmap {
    width: usize,
    depth: usize,
    max_height: u32,
    heights: Vec<u32>,
}

impl Heightmap {
    /// Build a grid from row-major column heights, `heights[z * width + x]`.
    ///
    /// # Panics
    ///
    /// Panics if `heights.len() != width * depth`.
    pub fn new(width: usize, depth: usize, heights: Vec<u32>) -> Self {
        assert_eq!(width * depth, heights.len(), "heightmap size does not match {}x{}", width, depth);
        let max_height = heights.iter().cloned().max().unwrap_or(0);
        Self {
            width,
            depth,
            max_height,
            heights,
        }
    }

    /// A grid with no voxels; every ray misses it.
    pub fn empty(width: usize, depth: usize) -> Self {
        Self::new(width, depth, vec![0; width * depth])
    }

    pub fn flat(width: usize, depth: usize, height: u32) -> Self {
        Self::new(width, depth, vec![height; width * depth])
    }

    /// Rolling hills built from a couple of sine waves; deterministic for a given size.
    pub fn terrain(width: usize, depth: usize, max_height: u32) -> Self {
        let heights = (0..depth)
            .flat_map(|z| (0..width).map(move |x| (x, z)))
            .map(|(x, z)| {
                let fx = x as Float / width.max(1) as Float;
                let fz = z as Float / depth.max(1) as Float;
                let wave = (fx * 7.0).sin() * (fz * 5.0).cos() + 0.5 * (fx * 17.0 + fz * 11.0).sin();
                let t = ((wave + 1.5) / 3.0).clamp(0.0, 1.0);
                1 + (t * (max_height.max(1) - 1) as Float).round() as u32
            })
            .collect();
        Self::new(width, depth, heights)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_height(&self) -> u32 {
        self.max_height
    }

    pub fn height(&self, x: usize, z: usize) -> u32 {
        self.heights[z * self.width + x]
    }

    pub fn size_in_bytes(&self) -> usize {
        self.heights.len() * std::mem::size_of::<u32>()
    }

    fn is_solid(&self, x: i64, y: i64, z: i64) -> bool {
        if x < 0 || z < 0 || y < 0 || x >= self.width as i64 || z >= self.depth as i64 {
            return false;
        }
        (y as u32) < self.height(x as usize, z as usize)
    }

    /// Clip the ray against the grid bounds, returning the parametric entry
    /// and exit distances and the axis of the entry slab.
    fn clip(&self, ray: &Ray, t_min: Float, t_max: Float) -> Option<(Float, Float, Option<usize>)> {
        let upper = [self.width as Float, self.max_height as Float, self.depth as Float];
        let mut t0 = t_min;
        let mut t1 = t_max;
        let mut entry_axis = None;

        for axis in 0..3 {
            let inv_dir = 1.0 / ray.dir[axis];
            let mut t_near = (0.0 - ray.origin[axis]) * inv_dir;
            let mut t_far = (upper[axis] - ray.origin[axis]) * inv_dir;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }
            // NaN from 0 * inf means the origin lies on the slab plane; treat as inside
            if t_near > t0 {
                t0 = t_near;
                entry_axis = Some(axis);
            }
            if t_far < t1 {
                t1 = t_far;
            }
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1, entry_axis))
    }
}

impl Intersect for Heightmap {
    fn intersect(&self, ray: &Ray, t_min: Float, t_max: Float) -> Option<Hit> {
        if self.max_height == 0 {
            return None;
        }
        let (t0, t1, entry_axis) = self.clip(ray, t_min, t_max)?;

        // Amanatides & Woo voxel walk starting at the clipped entry point
        let p = ray.at(t0);
        let mut cell = [0i64; 3];
        let mut step = [0i64; 3];
        let mut t_next = [INFINITY; 3];
        let mut t_delta = [INFINITY; 3];
        let upper = [self.width as i64, self.max_height as i64, self.depth as i64];

        for axis in 0..3 {
            let mut c = p[axis].floor() as i64;
            if entry_axis == Some(axis) && ray.dir[axis] < 0.0 {
                // entered through the upper face of the grid
                c = upper[axis] - 1;
            }
            cell[axis] = c.max(0).min(upper[axis] - 1);

            let d = ray.dir[axis];
            if d > 0.0 {
                step[axis] = 1;
                t_delta[axis] = 1.0 / d;
                t_next[axis] = ((cell[axis] + 1) as Float - ray.origin[axis]) / d;
            } else if d < 0.0 {
                step[axis] = -1;
                t_delta[axis] = -1.0 / d;
                t_next[axis] = (cell[axis] as Float - ray.origin[axis]) / d;
            }
        }

        // entering the grid straight into a solid voxel; a ray that starts inside the
        // grid never tests its own cell
        if let Some(axis) = entry_axis {
            if self.is_solid(cell[0], cell[1], cell[2]) {
                return Some(Hit { face: Face::from_axis(axis), distance: t0 });
            }
        }

        loop {
            let axis = if t_next[0] < t_next[1] {
                if t_next[0] < t_next[2] { 0 } else { 2 }
            } else if t_next[1] < t_next[2] {
                1
            } else {
                2
            };

            let t = t_next[axis];
            if t > t1 {
                return None;
            }
            cell[axis] += step[axis];
            if cell[axis] < 0 || cell[axis] >= upper[axis] {
                return None;
            }
            if self.is_solid(cell[0], cell[1], cell[2]) {
                return Some(Hit { face: Face::from_axis(axis), distance: t.max(t_min) });
            }
            t_next[axis] += t_delta[axis];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn empty_heightmap_never_hits() {
        let hm = Heightmap::empty(4, 4);
        let ray = Ray::new(point3f!(2, 5, 2), vec3f!(0, -1, 0));
        assert_eq!(hm.intersect(&ray, 0.0, INFINITY), None);
    }

    #[test]
    fn vertical_ray_hits_top_face() {
        let hm = Heightmap::flat(4, 4, 2);
        let ray = Ray::new(point3f!(1.5, 10, 1.5), vec3f!(0, -1, 0));
        let hit = hm.intersect(&ray, 0.0, INFINITY).unwrap();
        assert_eq!(hit.face, Face::Y);
        assert_abs_diff_eq!(hit.distance, 8.0, epsilon = 1e-5);
    }

    #[test]
    fn horizontal_ray_hits_column_side() {
        let mut heights = vec![0; 16];
        // single column at x = 2, z = 1 of height 3
        heights[1 * 4 + 2] = 3;
        let hm = Heightmap::new(4, 4, heights);
        let ray = Ray::new(point3f!(0.5, 1.5, 1.5), vec3f!(1, 0, 0));
        let hit = hm.intersect(&ray, 0.0, INFINITY).unwrap();
        assert_eq!(hit.face, Face::X);
        assert_abs_diff_eq!(hit.distance, 1.5, epsilon = 1e-5);

        // climbing over the column it leaves the grid first
        let over = Ray::new(point3f!(0.5, 2.5, 1.5), vec3f!(1, 0.5, 0));
        assert_eq!(hm.intersect(&over, 0.0, INFINITY), None);
    }

    #[test]
    fn ray_from_outside_enters_through_side() {
        let hm = Heightmap::flat(4, 4, 2);
        let ray = Ray::new(point3f!(-3, 1, 2.5), vec3f!(1, 0, 0));
        let hit = hm.intersect(&ray, 0.0, INFINITY).unwrap();
        assert_eq!(hit.face, Face::X);
        assert_abs_diff_eq!(hit.distance, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn upward_ray_from_surface_escapes() {
        let hm = Heightmap::flat(4, 4, 2);
        let ray = Ray::new(point3f!(1.5, 2.001, 1.5), vec3f!(0.3, 0.9, -0.3));
        assert_eq!(hm.intersect(&ray, 0.0, INFINITY), None);
    }

    #[test]
    fn respects_t_max() {
        let hm = Heightmap::flat(4, 4, 2);
        let ray = Ray::new(point3f!(1.5, 10, 1.5), vec3f!(0, -1, 0));
        assert_eq!(hm.intersect(&ray, 0.0, 5.0), None);
    }

    #[test]
    fn terrain_heights_are_positive() {
        let hm = Heightmap::terrain(16, 16, 6);
        assert!(hm.max_height() <= 6);
        assert!((0..16).all(|x| (0..16).all(|z| hm.height(x, z) >= 1)));
    }

    #[test]
    #[should_panic(expected = "heightmap size does not match 3x2")]
    fn mismatched_heights_are_rejected() {
        Heightmap::new(3, 2, vec![1; 5]);
    }
}
