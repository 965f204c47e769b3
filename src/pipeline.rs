//! Per-request reduction pipeline.
//!
//! Classify, filter, budget and sample in one synchronous pass over a shared
//! dataset. The pipeline is pure CPU work with no I/O, so request handlers
//! run it on a blocking thread or the Rayon pool.

use crate::classify::{self, Classification, Thresholds};
use crate::dataset::Dataset;
use crate::filter;
use crate::lod;
use crate::models::Viewport;
use crate::sample::{self, SampleParams};

/// Level-of-detail knobs shared by all requests, built from the server
/// configuration.
#[derive(Clone, Copy, Debug)]
pub struct LodConfig {
    pub max_adaptive_points: u64,
    pub zoom_cap_multiplier: f64,
    pub viewport_buffer_ratio: f64,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            max_adaptive_points: lod::DEFAULT_MAX_ADAPTIVE_POINTS,
            zoom_cap_multiplier: lod::DEFAULT_ZOOM_CAP_MULTIPLIER,
            viewport_buffer_ratio: filter::DEFAULT_BUFFER_RATIO,
        }
    }
}

/// Per-request reduction parameters, owned so the pipeline can move to a
/// worker thread.
#[derive(Clone, Debug)]
pub struct ReductionSpec {
    pub thresholds: Thresholds,
    pub search_term: Option<String>,
    pub viewport: Option<Viewport>,
    pub max_points: u64,
    pub zoom_level: f64,
}

/// Outcome of a reduction: the selected row indices plus the category view
/// they were selected under.
#[derive(Debug)]
pub struct Reduction {
    pub indices: Vec<u32>,
    pub classification: Classification,
    pub points_before_sampling: u64,
    pub was_downsampled: bool,
}

/// Run the full classify → filter → budget → sample chain.
pub fn reduce(dataset: &Dataset, spec: &ReductionSpec, config: &LodConfig) -> Reduction {
    let classification = classify::classify(dataset, &spec.thresholds);

    let mut candidates = filter::search_filter(dataset, spec.search_term.as_deref());
    if let Some(viewport) = &spec.viewport {
        candidates = filter::viewport_filter(
            dataset,
            candidates,
            viewport,
            config.viewport_buffer_ratio,
        );
    }
    let points_before_sampling = candidates.len() as u64;

    let target = lod::point_budget(
        spec.zoom_level,
        spec.max_points,
        config.max_adaptive_points,
        config.zoom_cap_multiplier,
    );
    let significant_ratio = lod::significant_ratio(spec.zoom_level);
    let seed = sampling_seed(dataset, spec, target, significant_ratio);

    let indices = sample::downsample(
        dataset,
        &classification.categories,
        candidates,
        &SampleParams {
            target: target as usize,
            significant_ratio,
            seed,
        },
    );
    let was_downsampled = (indices.len() as u64) < points_before_sampling;

    Reduction {
        indices,
        classification,
        points_before_sampling,
        was_downsampled,
    }
}

/// Derive a request-deterministic sampling seed so repeated identical
/// requests return identical samples.
fn sampling_seed(dataset: &Dataset, spec: &ReductionSpec, target: u64, ratio: f64) -> u64 {
    let mut components = vec![
        dataset.meta.key.seed(),
        dataset.meta.key.size(),
        target,
        ratio.to_bits(),
        spec.zoom_level.to_bits(),
    ];
    if let Some(viewport) = &spec.viewport {
        components.extend([
            viewport.x_min.to_bits(),
            viewport.x_max.to_bits(),
            viewport.y_min.to_bits(),
            viewport.y_max.to_bits(),
        ]);
    }
    if let Some(term) = &spec.search_term {
        components.extend(term.bytes().map(u64::from));
    }
    sample::mix_seed(&components)
}
