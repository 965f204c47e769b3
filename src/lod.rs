//! Level-of-detail policy.
//!
//! Two pure numeric functions: the point budget for a zoom level, and the
//! significant-row ratio schedule handed to the sampler. Both are free of
//! I/O so they can be unit tested over a grid of zoom levels.

/// Default ceiling on the adaptive budget regardless of zoom.
pub const DEFAULT_MAX_ADAPTIVE_POINTS: u64 = 50_000;

/// Default cap on the zoom multiplier.
pub const DEFAULT_ZOOM_CAP_MULTIPLIER: f64 = 100.0;

/// Ratio schedule breakpoints: at overview zoom most of the budget is
/// reserved for significant rows; at high zoom enough points are rendered
/// that raw density becomes informative and the bias is relaxed.
const RATIO_SCHEDULE: [(f64, f64); 4] = [(1.0, 0.6), (2.0, 0.5), (3.0, 0.4), (4.0, 0.3)];

/// Convert a zoom level into a target point budget.
///
/// `budget = min(base_points * min(zoom^1.5, cap_multiplier),
/// max_adaptive_points)`, monotonically non-decreasing in `zoom_level` and
/// never below `base_points` unless the adaptive ceiling is lower.
pub fn point_budget(
    zoom_level: f64,
    base_points: u64,
    max_adaptive_points: u64,
    cap_multiplier: f64,
) -> u64 {
    let zoom = zoom_level.max(1.0);
    let multiplier = zoom.powf(1.5).min(cap_multiplier.max(1.0));
    let scaled = (base_points as f64 * multiplier).round() as u64;
    let floor = base_points.min(max_adaptive_points);
    scaled.clamp(floor, max_adaptive_points.max(floor))
}

/// Fraction of the sampling budget reserved for significant rows at a given
/// zoom level, linearly interpolated between schedule breakpoints and
/// clamped outside them.
pub fn significant_ratio(zoom_level: f64) -> f64 {
    let (first_zoom, first_ratio) = RATIO_SCHEDULE[0];
    if zoom_level <= first_zoom {
        return first_ratio;
    }
    for window in RATIO_SCHEDULE.windows(2) {
        let (lo_zoom, lo_ratio) = window[0];
        let (hi_zoom, hi_ratio) = window[1];
        if zoom_level <= hi_zoom {
            let t = (zoom_level - lo_zoom) / (hi_zoom - lo_zoom);
            return lo_ratio + t * (hi_ratio - lo_ratio);
        }
    }
    RATIO_SCHEDULE[RATIO_SCHEDULE.len() - 1].1
}
