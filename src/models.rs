//! Request and response types and associated validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// The visible coordinate rectangle a client is currently viewing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Parameters of a volcano plot request.
///
/// Accepted both as a JSON body and as URL query parameters; every field has
/// a default so a bare GET serves the overview dataset.
#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields, default)]
#[validate(schema(function = "validate_volcano_request"))]
pub struct VolcanoRequest {
    /// Number of rows to generate (or reuse from the cache)
    #[validate(range(
        min = 100,
        max = 10_000_000,
        message = "dataset_size must be between 100 and 10000000"
    ))]
    pub dataset_size: u64,
    /// Adjusted p-value threshold for significance
    #[validate(range(
        min = 0.0,
        max = 1.0,
        message = "p_value_threshold must be between 0 and 1"
    ))]
    pub p_value_threshold: f64,
    /// Lower fold-change bound; rows below classify as down-regulated
    #[validate(range(
        min = -10.0,
        max = 10.0,
        message = "log_fc_min must be between -10 and 10"
    ))]
    pub log_fc_min: f64,
    /// Upper fold-change bound; rows above classify as up-regulated
    #[validate(range(
        min = -10.0,
        max = 10.0,
        message = "log_fc_max must be between -10 and 10"
    ))]
    pub log_fc_max: f64,
    /// Case-insensitive substring filter on row identifiers
    pub search_term: Option<String>,
    /// Sampler budget at overview zoom
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "max_points must be between 1 and 1000000"
    ))]
    pub max_points: u64,
    /// Client zoom factor; 1.0 is fully zoomed out
    #[validate(range(min = 1.0, max = 1000.0, message = "zoom_level must be at least 1"))]
    pub zoom_level: f64,
    /// Generation seed; falls back to the server default when absent
    pub seed: Option<u64>,
    /// Viewport bounds; either all four are present or none
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
}

impl Default for VolcanoRequest {
    fn default() -> Self {
        Self {
            dataset_size: 10_000,
            p_value_threshold: 0.05,
            log_fc_min: -0.5,
            log_fc_max: 0.5,
            search_term: None,
            max_points: 2000,
            zoom_level: 1.0,
            seed: None,
            x_min: None,
            x_max: None,
            y_min: None,
            y_max: None,
        }
    }
}

impl VolcanoRequest {
    pub fn viewport(&self) -> Option<Viewport> {
        viewport_from_bounds(self.x_min, self.x_max, self.y_min, self.y_max)
    }
}

/// Parameters of a PCA scores request.
#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields, default)]
#[validate(schema(function = "validate_pca_request"))]
pub struct PcaRequest {
    /// Number of samples to generate
    #[validate(range(
        min = 100,
        max = 10_000_000,
        message = "n_samples must be between 100 and 10000000"
    ))]
    pub n_samples: u64,
    /// Number of sample groups
    #[validate(range(min = 2, max = 20, message = "n_groups must be between 2 and 20"))]
    pub n_groups: u16,
    /// Case-insensitive substring filter on sample identifiers
    pub search_term: Option<String>,
    /// Sampler budget at overview zoom
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "max_points must be between 1 and 1000000"
    ))]
    pub max_points: u64,
    /// Client zoom factor; 1.0 is fully zoomed out
    #[validate(range(min = 1.0, max = 1000.0, message = "zoom_level must be at least 1"))]
    pub zoom_level: f64,
    /// Generation seed; falls back to the server default when absent
    pub seed: Option<u64>,
    /// Viewport bounds over PC1/PC2; either all four are present or none
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
}

impl Default for PcaRequest {
    fn default() -> Self {
        Self {
            n_samples: 5000,
            n_groups: 5,
            search_term: None,
            max_points: 2000,
            zoom_level: 1.0,
            seed: None,
            x_min: None,
            x_max: None,
            y_min: None,
            y_max: None,
        }
    }
}

impl PcaRequest {
    pub fn viewport(&self) -> Option<Viewport> {
        viewport_from_bounds(self.x_min, self.x_max, self.y_min, self.y_max)
    }
}

fn viewport_from_bounds(
    x_min: Option<f64>,
    x_max: Option<f64>,
    y_min: Option<f64>,
    y_max: Option<f64>,
) -> Option<Viewport> {
    match (x_min, x_max, y_min, y_max) {
        (Some(x_min), Some(x_max), Some(y_min), Some(y_max)) => Some(Viewport {
            x_min,
            x_max,
            y_min,
            y_max,
        }),
        _ => None,
    }
}

/// Validate that the viewport bounds are either absent or complete and
/// well-ordered.
fn validate_viewport_bounds(
    x_min: Option<f64>,
    x_max: Option<f64>,
    y_min: Option<f64>,
    y_max: Option<f64>,
) -> Result<(), ValidationError> {
    let present = [x_min, x_max, y_min, y_max]
        .iter()
        .filter(|bound| bound.is_some())
        .count();
    if present != 0 && present != 4 {
        return Err(ValidationError::new(
            "viewport requires all of x_min, x_max, y_min and y_max",
        ));
    }
    if let (Some(x_min), Some(x_max), Some(y_min), Some(y_max)) = (x_min, x_max, y_min, y_max) {
        if x_min >= x_max || y_min >= y_max {
            let mut error = ValidationError::new("viewport ranges must be non-empty");
            error.add_param("x_min".into(), &x_min);
            error.add_param("x_max".into(), &x_max);
            error.add_param("y_min".into(), &y_min);
            error.add_param("y_max".into(), &y_max);
            return Err(error);
        }
    }
    Ok(())
}

/// Validate a volcano request
fn validate_volcano_request(request: &VolcanoRequest) -> Result<(), ValidationError> {
    if request.log_fc_min >= request.log_fc_max {
        let mut error = ValidationError::new("log_fc_min must be less than log_fc_max");
        error.add_param("log_fc_min".into(), &request.log_fc_min);
        error.add_param("log_fc_max".into(), &request.log_fc_max);
        return Err(error);
    }
    validate_viewport_bounds(request.x_min, request.x_max, request.y_min, request.y_max)
}

/// Validate a PCA request
fn validate_pca_request(request: &PcaRequest) -> Result<(), ValidationError> {
    validate_viewport_bounds(request.x_min, request.x_max, request.y_min, request.y_max)
}

/// Request body for pre-populating the cache.
#[derive(Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
pub struct WarmRequest {
    /// Volcano dataset sizes to build ahead of user traffic
    #[validate(length(
        min = 1,
        max = 16,
        message = "sizes must contain between 1 and 16 entries"
    ))]
    pub sizes: Vec<u64>,
}

/// One returned volcano point. Field names match the original web client.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct VolcanoPoint {
    pub gene: String,
    #[serde(rename = "logFC")]
    pub log_fc: f64,
    pub padj: f64,
    #[serde(rename = "classyfireSuperclass")]
    pub superclass: Option<String>,
    pub category: String,
}

/// One returned PCA point.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct PcaPoint {
    pub sample: String,
    pub pc1: f64,
    pub pc2: f64,
    pub pc3: f64,
    pub category: String,
}

/// Response payload for the plot data endpoints.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct PlotResponse<P> {
    pub rows: Vec<P>,
    /// Per-category counts over the returned rows only
    pub category_counts: BTreeMap<String, u64>,
    /// Dataset size before any filtering or sampling
    pub total_rows: u64,
    /// Number of rows in this response
    pub returned_rows: u64,
    /// Candidate count after filtering, before sampling
    pub points_before_sampling: u64,
    pub was_downsampled: bool,
}

/// Response to a cache clear.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct ClearCacheResponse {
    pub removed_count: usize,
}

/// Response to a cache status query.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct CacheStatusResponse {
    pub cached_keys: Vec<String>,
    pub total_cached: usize,
    pub total_size_bytes_estimate: u64,
}

/// Response to a cache warm request.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct WarmCacheResponse {
    pub cached_sizes: Vec<u64>,
}
