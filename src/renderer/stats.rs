use std::fmt;
use std::ops::AddAssign;

/// Counters gathered on the host while compacting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Bounce iterations, one intersect + shade launch pair each.
    pub bounces: u64,
    /// Kernel threads launched, idle slots included.
    pub rays_traced: u64,
    /// Paths that left a surface and carry on to the next bounce.
    pub scattered: u64,
    /// Paths that left the scene and picked up sky radiance.
    pub escaped: u64,
    /// Paths absorbed at a surface.
    pub absorbed: u64,
    /// Paths stopped at the bounce limit.
    pub cut_off: u64,
    /// Fresh samples started in freed slots.
    pub regenerated: u64,
}

impl RenderStats {
    pub fn completed(&self) -> u64 {
        self.escaped + self.absorbed + self.cut_off
    }
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, rhs: Self) {
        self.bounces += rhs.bounces;
        self.rays_traced += rhs.rays_traced;
        self.scattered += rhs.scattered;
        self.escaped += rhs.escaped;
        self.absorbed += rhs.absorbed;
        self.cut_off += rhs.cut_off;
        self.regenerated += rhs.regenerated;
    }
}

impl std::iter::Sum for RenderStats {
    fn sum<I: Iterator<Item=Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, s| {
            acc += s;
            acc
        })
    }
}

impl fmt::Display for RenderStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bounces, {} rays, {} scattered, {} escaped, {} absorbed, {} cut off, {} regenerated",
            self.bounces, self.rays_traced, self.scattered, self.escaped, self.absorbed, self.cut_off, self.regenerated
        )
    }
}
