//! Seeded random streams.
//!
//! Every stream is derived from the render seed plus a small key, so the same
//! configuration always reproduces the same image regardless of how units are
//! scheduled across threads.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

pub type Rng = Xoshiro256Plus;

/// SplitMix64 finalizer, used to fold keys into a seed.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn combine(seed: u64, keys: &[u64]) -> u64 {
    keys.iter().fold(mix(seed), |acc, &k| mix(acc ^ k))
}

/// Stream used on the host for camera jitter of one work unit.
pub fn host_rng(seed: u64, unit: usize) -> Rng {
    Rng::seed_from_u64(combine(seed, &[0x686f_7374, unit as u64]))
}

/// Stream for one kernel thread of one launch. The bounce counter is part of the
/// key so that successive bounces of the same slot are decorrelated.
pub fn kernel_rng(seed: u64, unit: usize, bounce: u64, thread: usize) -> Rng {
    Rng::seed_from_u64(combine(seed, &[unit as u64, bounce, thread as u64]))
}
