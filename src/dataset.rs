//! Core dataset types.
//!
//! A [Dataset] is generated once, cached, and then shared read-only between
//! concurrent requests as an `Arc<Dataset>`. Filtering, classification and
//! sampling never mutate a dataset; they produce parallel views (category
//! vectors, index lists) layered on top of it.

use std::fmt;
use std::time::SystemTime;

use strum_macros::Display;

/// The two dataset families served by the engine.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum DatasetKind {
    /// Differential-abundance data plotted as effect magnitude against
    /// significance.
    Volcano,
    /// Principal-component scores with a group assignment per sample.
    Pca,
}

/// The generation parameters that uniquely determine a dataset's content.
///
/// Equal keys must map to bit-identical datasets, so every parameter that
/// affects generated values belongs here and nothing else does.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Volcano { size: u64, seed: u64 },
    Pca { samples: u64, groups: u16, seed: u64 },
}

impl CacheKey {
    pub fn kind(&self) -> DatasetKind {
        match self {
            CacheKey::Volcano { .. } => DatasetKind::Volcano,
            CacheKey::Pca { .. } => DatasetKind::Pca,
        }
    }

    /// Requested row count.
    pub fn size(&self) -> u64 {
        match self {
            CacheKey::Volcano { size, .. } => *size,
            CacheKey::Pca { samples, .. } => *samples,
        }
    }

    /// Seed the generator was (or will be) run with.
    pub fn seed(&self) -> u64 {
        match self {
            CacheKey::Volcano { seed, .. } => *seed,
            CacheKey::Pca { seed, .. } => *seed,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Volcano { size, seed } => {
                write!(f, "{}:{}:{}", self.kind(), size, seed)
            }
            CacheKey::Pca {
                samples,
                groups,
                seed,
            } => write!(f, "{}:{}x{}:{}", self.kind(), samples, groups, seed),
        }
    }
}

/// One plotted data point.
///
/// For volcano datasets `x` is the log2 fold change, `y` is -log10 of the
/// adjusted p-value and `group` indexes the compound superclass table. For
/// PCA datasets `x`, `y` and `z` are the first three component scores and
/// `group` indexes the sample group table.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub p_adj: Option<f64>,
    pub group: Option<u16>,
}

impl Row {
    /// Extremeness measure used to rank rows when the sampler must drop
    /// some of them: absolute effect magnitude for volcano rows, distance
    /// from the origin for component scores.
    pub fn magnitude(&self) -> f64 {
        match self.z {
            Some(z) => (self.x * self.x + self.y * self.y + z * z).sqrt(),
            None => self.x.abs(),
        }
    }
}

/// Generation metadata carried alongside the rows.
#[derive(Clone, Debug)]
pub struct DatasetMeta {
    pub key: CacheKey,
    pub generated_at: SystemTime,
    pub size_bytes_estimate: u64,
}

/// An immutable, generated collection of rows.
#[derive(Debug)]
pub struct Dataset {
    pub rows: Vec<Row>,
    /// Label table referenced by `Row::group`.
    pub groups: Vec<String>,
    pub meta: DatasetMeta,
}

impl Dataset {
    /// Assemble a dataset, computing its memory footprint estimate.
    pub fn new(key: CacheKey, rows: Vec<Row>, groups: Vec<String>) -> Self {
        let heap_bytes: usize = rows.iter().map(|row| row.id.len()).sum::<usize>()
            + groups.iter().map(|label| label.len()).sum::<usize>();
        let size_bytes_estimate =
            (rows.len() * std::mem::size_of::<Row>() + heap_bytes) as u64;
        Self {
            rows,
            groups,
            meta: DatasetMeta {
                key,
                generated_at: SystemTime::now(),
                size_bytes_estimate,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn kind(&self) -> DatasetKind {
        self.meta.key.kind()
    }

    pub fn group_label(&self, index: u16) -> Option<&str> {
        self.groups.get(usize::from(index)).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_display() {
        let key = CacheKey::Volcano {
            size: 10000,
            seed: 42,
        };
        assert_eq!("volcano:10000:42", key.to_string());
        let key = CacheKey::Pca {
            samples: 5000,
            groups: 5,
            seed: 7,
        };
        assert_eq!("pca:5000x5:7", key.to_string());
    }

    #[test]
    fn cache_key_accessors() {
        let key = CacheKey::Pca {
            samples: 5000,
            groups: 5,
            seed: 7,
        };
        assert_eq!(DatasetKind::Pca, key.kind());
        assert_eq!(5000, key.size());
        assert_eq!(7, key.seed());
    }

    #[test]
    fn magnitude_volcano() {
        let row = Row {
            id: "Taurine".to_string(),
            x: -2.5,
            y: 4.0,
            z: None,
            p_adj: Some(0.0001),
            group: None,
        };
        assert_eq!(2.5, row.magnitude());
    }

    #[test]
    fn magnitude_pca() {
        let row = Row {
            id: "Sample_1".to_string(),
            x: 3.0,
            y: 0.0,
            z: Some(4.0),
            p_adj: None,
            group: Some(0),
        };
        assert_eq!(5.0, row.magnitude());
    }

    #[test]
    fn size_estimate_grows_with_rows() {
        let make = |n: usize| {
            let rows = (0..n)
                .map(|i| Row {
                    id: format!("Metabolite_{}", i + 1),
                    x: 0.0,
                    y: 0.0,
                    z: None,
                    p_adj: Some(1.0),
                    group: None,
                })
                .collect();
            Dataset::new(
                CacheKey::Volcano {
                    size: n as u64,
                    seed: 0,
                },
                rows,
                vec![],
            )
        };
        assert!(make(200).meta.size_bytes_estimate > make(100).meta.size_bytes_estimate);
    }
}
