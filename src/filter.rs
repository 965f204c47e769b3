//! Row filtering.
//!
//! Filters are allocation-light linear scans producing row indices into an
//! immutable dataset; row data is never copied.

use crate::dataset::Dataset;
use crate::models::Viewport;

/// Default fraction of the viewport width added on each side, so points
/// just outside the visible rectangle survive a small pan without a refetch.
pub const DEFAULT_BUFFER_RATIO: f64 = 0.2;

/// Return the indices of rows whose identifier contains `term`,
/// case-insensitively. Without a term every row is a candidate.
pub fn search_filter(dataset: &Dataset, term: Option<&str>) -> Vec<u32> {
    match term {
        Some(term) if !term.is_empty() => {
            let needle = term.to_lowercase();
            dataset
                .rows
                .iter()
                .enumerate()
                .filter(|(_, row)| row.id.to_lowercase().contains(&needle))
                .map(|(index, _)| index as u32)
                .collect()
        }
        _ => (0..dataset.len() as u32).collect(),
    }
}

/// Restrict `candidates` to rows whose plotted coordinates fall inside the
/// viewport expanded on each axis by `buffer_ratio` times the axis width.
pub fn viewport_filter(
    dataset: &Dataset,
    candidates: Vec<u32>,
    viewport: &Viewport,
    buffer_ratio: f64,
) -> Vec<u32> {
    let x_buffer = (viewport.x_max - viewport.x_min) * buffer_ratio;
    let y_buffer = (viewport.y_max - viewport.y_min) * buffer_ratio;
    let x_min = viewport.x_min - x_buffer;
    let x_max = viewport.x_max + x_buffer;
    let y_min = viewport.y_min - y_buffer;
    let y_max = viewport.y_max + y_buffer;
    candidates
        .into_iter()
        .filter(|&index| {
            let row = &dataset.rows[index as usize];
            row.x >= x_min && row.x <= x_max && row.y >= y_min && row.y <= y_max
        })
        .collect()
}
