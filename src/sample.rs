//! Significance-preserving downsampling.
//!
//! Sampling never upsamples, never fabricates rows and never duplicates a
//! row: the output is always a subset of the candidate indices. Randomness
//! comes from a request-derived seed so identical requests return identical
//! samples.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::classify::Category;
use crate::dataset::Dataset;

/// Sampler contract for a single request.
#[derive(Clone, Copy, Debug)]
pub struct SampleParams {
    /// Maximum number of rows to return.
    pub target: usize,
    /// Fraction of the target reserved for significant rows.
    pub significant_ratio: f64,
    /// Request-deterministic seed for the uniform draw.
    pub seed: u64,
}

/// Reduce `candidates` to at most `params.target` indices.
///
/// When the candidate set already fits the budget it is returned unchanged.
/// Otherwise significant rows get a quota of `target * significant_ratio`
/// slots; an overfull significant set is resolved by magnitude-descending
/// order with stable input-order ties, so the most extreme points are never
/// dropped ahead of marginal ones. The remaining slots are filled from the
/// other rows by a seeded partial Fisher-Yates draw without replacement.
pub fn downsample(
    dataset: &Dataset,
    categories: &[Category],
    candidates: Vec<u32>,
    params: &SampleParams,
) -> Vec<u32> {
    if candidates.len() <= params.target {
        return candidates;
    }

    let (mut significant, other): (Vec<u32>, Vec<u32>) = candidates
        .into_iter()
        .partition(|&index| categories[index as usize].is_significant());

    let ratio = params.significant_ratio.clamp(0.0, 1.0);
    let quota = ((params.target as f64 * ratio).round() as usize).min(significant.len());
    // If the non-significant pool cannot fill its share, give the slack
    // back to the significant side (and vice versa, implicitly, because the
    // quota is already capped by the significant count).
    let take_other = (params.target - quota).min(other.len());
    let take_significant = (params.target - take_other).min(significant.len());

    if take_significant < significant.len() {
        significant.sort_by(|&a, &b| {
            let magnitude_a = dataset.rows[a as usize].magnitude();
            let magnitude_b = dataset.rows[b as usize].magnitude();
            magnitude_b.total_cmp(&magnitude_a).then(a.cmp(&b))
        });
        significant.truncate(take_significant);
    }

    let mut selected = significant;
    selected.extend(sample_without_replacement(other, take_other, params.seed));
    selected
}

/// Uniformly draw `count` items from `pool` without replacement using a
/// partial Fisher-Yates shuffle.
fn sample_without_replacement(mut pool: Vec<u32>, count: usize, seed: u64) -> Vec<u32> {
    if count >= pool.len() {
        return pool;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..count {
        let j = rng.gen_range(i..pool.len());
        pool.swap(i, j);
    }
    pool.truncate(count);
    pool
}

/// Fold request parameters into a sampling seed (splitmix64 finalizer per
/// component).
pub fn mix_seed(components: &[u64]) -> u64 {
    let mut state = 0x51_7c_c1_b7_27_22_0a_95_u64;
    for &component in components {
        state = splitmix64(state ^ component);
    }
    state
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}
