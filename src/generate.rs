//! Synthetic dataset generation.
//!
//! Generation is a pure function of the [CacheKey](crate::dataset::CacheKey)
//! and shape parameters: identical inputs always produce identical rows.
//! This is what makes cache-key based reuse sound and tests reproducible.
//! Both generators run in a single linear pass over the requested size.

use crate::dataset::{CacheKey, Dataset, Row};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Compound names assigned to the first rows of a volcano dataset, after
/// which rows fall back to a numbered identifier.
const METABOLITE_NAMES: [&str; 30] = [
    "1,3-Isoquinolinediol",
    "3,4-Dihydro-3-oxo-2H-(1,4)-benzoxazin-2-ylacetic acid",
    "(2-oxo-2,3-dihydro-1H-indol-3-yl)acetic acid",
    "Resedine",
    "Methionine sulfoxide",
    "trans-Urocanic acid",
    "Pro-Tyr",
    "Glu-Gly-Glu",
    "NP-024517",
    "Trp-Pro",
    "Biotin",
    "Pyridoxine",
    "Sulfocholic acid",
    "Pro-Pro",
    "Targinine",
    "L-Carnitine",
    "Taurine",
    "Creatine",
    "Adenosine",
    "Guanosine",
    "Cytidine",
    "Uridine",
    "Thymidine",
    "Inosine",
    "Xanthosine",
    "Hypoxanthine",
    "Xanthine",
    "Uric acid",
    "Allantoin",
    "Creatinine",
];

/// Superclass labels drawn per row.
const SUPERCLASSES: [&str; 5] = [
    "Organic acids and derivatives",
    "Organoheterocyclic compounds",
    "Lipids and lipid-like molecules",
    "Others",
    "Nucleosides, nucleotides, and analogues",
];

/// Shape of the volcano distribution.
///
/// Rows are drawn from three tiers. The tier fractions are parameters so
/// tests can assert on expected proportions rather than magic constants:
/// extreme rows carry a large magnitude and a small p-value, moderate rows
/// sit between, and the remainder cluster near the null with large p-values.
#[derive(Clone, Copy, Debug)]
pub struct VolcanoShape {
    /// Fraction of rows in the extreme tier.
    pub extreme_fraction: f64,
    /// Fraction of rows in the moderate tier.
    pub moderate_fraction: f64,
    /// Upper bound on |log fold change|.
    pub magnitude_limit: f64,
    /// Magnitude at which a row counts as extreme.
    pub extreme_magnitude: f64,
    /// Magnitude at which a row counts as moderate.
    pub moderate_magnitude: f64,
}

impl Default for VolcanoShape {
    fn default() -> Self {
        Self {
            extreme_fraction: 0.15,
            moderate_fraction: 0.20,
            magnitude_limit: 4.0,
            extreme_magnitude: 1.5,
            moderate_magnitude: 0.8,
        }
    }
}

/// Shape of the PCA score distribution.
#[derive(Clone, Copy, Debug)]
pub struct PcaShape {
    /// Group centers are drawn uniformly from [-center_range, center_range]
    /// on each component.
    pub center_range: f64,
    /// Per-sample jitter around the group center.
    pub scatter: f64,
}

impl Default for PcaShape {
    fn default() -> Self {
        Self {
            center_range: 5.0,
            scatter: 2.0,
        }
    }
}

/// Generate the dataset described by `key` with default shape parameters.
pub fn generate(key: &CacheKey) -> Dataset {
    match key {
        CacheKey::Volcano { size, seed } => {
            generate_volcano(*size, *seed, &VolcanoShape::default())
        }
        CacheKey::Pca {
            samples,
            groups,
            seed,
        } => generate_pca(*samples, *groups, *seed, &PcaShape::default()),
    }
}

/// Generate a volcano dataset of `size` rows.
///
/// The p-value range is correlated with the magnitude tier so that large
/// fold changes come with small p-values, mirroring real differential
/// abundance results.
pub fn generate_volcano(size: u64, seed: u64, shape: &VolcanoShape) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let size = size as usize;
    let mut rows = Vec::with_capacity(size);
    for i in 0..size {
        let tier = rng.gen::<f64>();
        let (magnitude_range, p_range) = if tier < shape.extreme_fraction {
            (shape.extreme_magnitude..shape.magnitude_limit, 0.0..0.1)
        } else if tier < shape.extreme_fraction + shape.moderate_fraction {
            (shape.moderate_magnitude..shape.extreme_magnitude, 0.0..0.3)
        } else {
            (0.0..shape.moderate_magnitude, 0.2..1.0)
        };
        let magnitude: f64 = rng.gen_range(magnitude_range);
        let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
        let log_fc = round_to(sign * magnitude, 1e4);
        let p_adj = round_to(rng.gen_range(p_range), 1e6);
        let superclass = rng.gen_range(0..SUPERCLASSES.len()) as u16;
        let id = match METABOLITE_NAMES.get(i) {
            Some(name) => (*name).to_string(),
            None => format!("Metabolite_{}", i + 1),
        };
        rows.push(Row {
            id,
            x: log_fc,
            // Clamp away from zero so the plotted coordinate stays finite.
            y: -(p_adj.max(1e-10)).log10(),
            z: None,
            p_adj: Some(p_adj),
            group: Some(superclass),
        });
    }
    let groups = SUPERCLASSES.iter().map(|s| (*s).to_string()).collect();
    Dataset::new(CacheKey::Volcano { size: size as u64, seed }, rows, groups)
}

/// Generate a PCA dataset of `samples` rows spread over `group_count`
/// clusters.
///
/// Samples are assigned to groups round-robin so group sizes stay balanced
/// for any sample count.
pub fn generate_pca(samples: u64, group_count: u16, seed: u64, shape: &PcaShape) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let group_count = group_count.max(1);
    let centers: Vec<[f64; 3]> = (0..group_count)
        .map(|_| {
            [
                rng.gen_range(-shape.center_range..shape.center_range),
                rng.gen_range(-shape.center_range..shape.center_range),
                rng.gen_range(-shape.center_range..shape.center_range),
            ]
        })
        .collect();
    let samples = samples as usize;
    let mut rows = Vec::with_capacity(samples);
    for i in 0..samples {
        let group = (i % usize::from(group_count)) as u16;
        let center = centers[usize::from(group)];
        let jitter = |rng: &mut StdRng| rng.gen_range(-shape.scatter..shape.scatter);
        let x = round_to(center[0] + jitter(&mut rng), 1e4);
        let y = round_to(center[1] + jitter(&mut rng), 1e4);
        let z = round_to(center[2] + jitter(&mut rng), 1e4);
        rows.push(Row {
            id: format!("Sample_{}", i + 1),
            x,
            y,
            z: Some(z),
            p_adj: None,
            group: Some(group),
        });
    }
    let groups = (1..=group_count).map(|g| format!("Group {}", g)).collect();
    Dataset::new(
        CacheKey::Pca {
            samples: samples as u64,
            groups: group_count,
            seed,
        },
        rows,
        groups,
    )
}

fn round_to(value: f64, scale: f64) -> f64 {
    (value * scale).round() / scale
}
