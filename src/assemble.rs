//! Response assembly.
//!
//! Counts are computed over the rows actually returned, while the
//! pre-sampling candidate count travels alongside so clients can display
//! "N of M points shown". Categories absent from the returned set still
//! appear with a zero count, matching what the plot legend renders.

use std::collections::BTreeMap;

use crate::dataset::{Dataset, DatasetKind, Row};
use crate::models::{PcaPoint, PlotResponse, VolcanoPoint};
use crate::pipeline::Reduction;

/// Build a response payload from a reduction, mapping each selected row
/// through `build_point`.
pub fn assemble<P>(
    dataset: &Dataset,
    reduction: &Reduction,
    build_point: impl Fn(&Row, &str) -> P,
) -> PlotResponse<P> {
    let mut category_counts: BTreeMap<String, u64> = match dataset.kind() {
        DatasetKind::Volcano => ["up", "down", "non_significant"]
            .iter()
            .map(|label| ((*label).to_string(), 0))
            .collect(),
        DatasetKind::Pca => dataset
            .groups
            .iter()
            .map(|label| (label.clone(), 0))
            .collect(),
    };

    let mut rows = Vec::with_capacity(reduction.indices.len());
    for &index in &reduction.indices {
        let row = &dataset.rows[index as usize];
        let label = reduction.classification.categories[index as usize].label(dataset);
        *category_counts.entry(label.clone()).or_insert(0) += 1;
        rows.push(build_point(row, &label));
    }

    PlotResponse {
        returned_rows: rows.len() as u64,
        rows,
        category_counts,
        total_rows: dataset.len() as u64,
        points_before_sampling: reduction.points_before_sampling,
        was_downsampled: reduction.was_downsampled,
    }
}

/// Map a volcano row into its wire representation.
pub fn volcano_point(dataset: &Dataset, row: &Row, category: &str) -> VolcanoPoint {
    VolcanoPoint {
        gene: row.id.clone(),
        log_fc: row.x,
        padj: row.p_adj.unwrap_or(1.0),
        superclass: row
            .group
            .and_then(|group| dataset.group_label(group))
            .map(str::to_string),
        category: category.to_string(),
    }
}

/// Map a PCA row into its wire representation.
pub fn pca_point(row: &Row, category: &str) -> PcaPoint {
    PcaPoint {
        sample: row.id.clone(),
        pc1: row.x,
        pc2: row.y,
        pc3: row.z.unwrap_or(0.0),
        category: category.to_string(),
    }
}
