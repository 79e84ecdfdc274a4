//! Host-side bookkeeping run between bounces.
//!
//! `retire` folds one bounce's shading results into the unit, freeing the slots
//! of paths that finished. `replenish` then hands those slots to the pixels that
//! are furthest behind, so every launch carries as many live paths as possible.

use crate::frame::Pixel;
use crate::renderer::kernels::{ColorRecord, Outcome};
use crate::renderer::stats::RenderStats;
use crate::renderer::work_unit::Sample;
use crate::spectrum::Spectrum;
use crate::Ray;

/// Consume the shading records of live slots. Finished paths add their
/// contribution to their pixel and have their slot pushed onto `freed`;
/// surviving paths pick up their scattered ray.
///
/// A path that scatters after already reaching `max_depth` is cut off without
/// contributing.
pub fn retire(
    samples: &mut [Sample],
    rays: &mut [Ray],
    records: &[ColorRecord],
    pixels: &mut [Pixel],
    color: &mut [Spectrum],
    max_depth: u32,
    freed: &mut Vec<usize>,
    stats: &mut RenderStats,
) {
    freed.clear();
    for (slot, (sample, record)) in samples.iter_mut().zip(records).enumerate() {
        if sample.done {
            continue;
        }
        let pixel = sample.pixel_id;
        if record.done() {
            color[pixel] += sample.not_absorbed * record.color;
            if record.outcome == Outcome::Escaped {
                stats.escaped += 1;
            } else {
                stats.absorbed += 1;
            }
        } else if sample.depth >= max_depth {
            stats.cut_off += 1;
        } else {
            rays[slot] = record.ray;
            sample.not_absorbed *= record.color;
            sample.depth += 1;
            stats.scattered += 1;
            continue;
        }
        sample.done = true;
        pixels[pixel].done += 1;
        freed.push(slot);
    }
}

/// True once every pixel has completed `ns` samples.
pub fn all_done(pixels: &[Pixel], ns: u32) -> bool {
    pixels.iter().all(|p| p.done == ns)
}

/// Pair freed slots with the least-sampled pixels that still need samples
/// started. `start` is called once per pairing with `(slot, pixel)`, after the
/// pixel's started count has been bumped. Returns the number of pairings.
///
/// Pixels are ranked by completed count, ties by index. Slots left over when no
/// pixel needs another sample stay idle.
pub fn replenish<F>(pixels: &mut [Pixel], pixel_idx: &mut Vec<usize>, freed: &[usize], ns: u32, mut start: F) -> usize
where
    F: FnMut(usize, usize),
{
    if freed.is_empty() {
        return 0;
    }

    pixel_idx.clear();
    pixel_idx.extend(0..pixels.len());
    // stable, so equal counts keep ascending pixel order
    pixel_idx.sort_by_key(|&p| pixels[p].done);

    let candidates: Vec<usize> = pixel_idx
        .iter()
        .copied()
        .filter(|&p| pixels[p].samples < ns)
        .take(freed.len())
        .collect();

    let mut assigned = 0;
    for (&slot, pixel) in freed.iter().zip(candidates) {
        pixels[pixel].samples += 1;
        start(slot, pixel);
        assigned += 1;
    }
    assigned
}
