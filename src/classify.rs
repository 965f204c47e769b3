//! Row classification.
//!
//! Classification is re-run per request because thresholds vary per request;
//! only coordinate generation is cached. It is a single linear scan that
//! never touches the cached dataset: the result is a category vector
//! parallel to the dataset's rows plus the per-category totals.

use std::collections::BTreeMap;

use crate::dataset::Dataset;

/// Classification thresholds supplied with each volcano request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// Adjusted p-value at or below which a row may be significant.
    pub significance: f64,
    /// Fold changes below this bound classify as down-regulated.
    pub magnitude_min: f64,
    /// Fold changes above this bound classify as up-regulated.
    pub magnitude_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            significance: 0.05,
            magnitude_min: -0.5,
            magnitude_max: 0.5,
        }
    }
}

/// Discrete significance category of a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Up,
    Down,
    NonSignificant,
    /// Group membership for datasets whose categories are fixed at
    /// generation time (PCA sample groups).
    Group(u16),
}

impl Category {
    /// Whether the sampler should treat this row as worth preserving over
    /// background rows. Group membership carries no significance signal, so
    /// grouped datasets downsample uniformly.
    pub fn is_significant(self) -> bool {
        matches!(self, Category::Up | Category::Down)
    }

    /// Human-readable label used in response payloads and count maps.
    pub fn label(self, dataset: &Dataset) -> String {
        match self {
            Category::Up => "up".to_string(),
            Category::Down => "down".to_string(),
            Category::NonSignificant => "non_significant".to_string(),
            Category::Group(index) => dataset
                .group_label(index)
                .map(str::to_string)
                .unwrap_or_else(|| format!("group_{}", index)),
        }
    }
}

/// A per-request category view over an immutable dataset.
#[derive(Debug)]
pub struct Classification {
    /// One category per dataset row, in row order.
    pub categories: Vec<Category>,
    /// Totals over the whole dataset; always sums to the row count.
    pub counts: BTreeMap<String, u64>,
}

/// Assign every row exactly one category.
///
/// Volcano rows follow the threshold rule: rows whose p-value exceeds the
/// significance threshold are non-significant, otherwise the fold change
/// decides between up, down and non-significant. Rows without a p-value
/// classify to their generation-time group.
pub fn classify(dataset: &Dataset, thresholds: &Thresholds) -> Classification {
    let mut categories = Vec::with_capacity(dataset.len());
    let mut counts = BTreeMap::new();
    for row in &dataset.rows {
        let category = match row.p_adj {
            Some(p_adj) => {
                if p_adj > thresholds.significance {
                    Category::NonSignificant
                } else if row.x > thresholds.magnitude_max {
                    Category::Up
                } else if row.x < thresholds.magnitude_min {
                    Category::Down
                } else {
                    Category::NonSignificant
                }
            }
            None => match row.group {
                Some(group) => Category::Group(group),
                None => Category::NonSignificant,
            },
        };
        *counts.entry(category.label(dataset)).or_insert(0) += 1;
        categories.push(category);
    }
    Classification { categories, counts }
}
