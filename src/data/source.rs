use std::{fs, path::PathBuf};

use ndarray::{Array1, Array2};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

use super::LabeledDataset;
use crate::error::{ClientErr, Result};

const DEFAULT_SAMPLES: usize = 150;
const DEFAULT_FEATURES: usize = 4;
const DEFAULT_CLASSES: usize = 3;
const DEFAULT_SEED: u64 = 42;

/// Half-width of the box blob centers are drawn from.
const CENTER_BOX: f32 = 10.0;

/// Where the global (pre-partitioning) dataset comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatasetSource {
    /// Isotropic gaussian blobs, one per class.
    Synthetic {
        #[serde(default = "default_samples")]
        samples: usize,
        #[serde(default = "default_features")]
        features: usize,
        #[serde(default = "default_classes")]
        classes: usize,
        #[serde(default = "default_seed")]
        seed: u64,
    },
    /// A numeric CSV file whose last column is the integer label.
    Csv { path: PathBuf },
    Inline {
        features: Vec<Vec<f32>>,
        labels: Vec<i64>,
    },
}

fn default_samples() -> usize {
    DEFAULT_SAMPLES
}

fn default_features() -> usize {
    DEFAULT_FEATURES
}

fn default_classes() -> usize {
    DEFAULT_CLASSES
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for DatasetSource {
    fn default() -> Self {
        Self::Synthetic {
            samples: DEFAULT_SAMPLES,
            features: DEFAULT_FEATURES,
            classes: DEFAULT_CLASSES,
            seed: DEFAULT_SEED,
        }
    }
}

impl DatasetSource {
    /// Materializes the whole dataset in memory.
    ///
    /// # Errors
    /// Returns `ClientErr::Dataset` if the source is malformed or empty, or
    /// `ClientErr::Io` if a file cannot be read.
    pub fn load(&self) -> Result<LabeledDataset> {
        match self {
            DatasetSource::Synthetic {
                samples,
                features,
                classes,
                seed,
            } => make_blobs(*samples, *features, *classes, *seed),
            DatasetSource::Csv { path } => {
                let content = fs::read_to_string(path)?;
                parse_csv(&content)
            }
            DatasetSource::Inline { features, labels } => {
                LabeledDataset::from_rows(features.clone(), labels.clone())
            }
        }
    }
}

fn make_blobs(samples: usize, features: usize, classes: usize, seed: u64) -> Result<LabeledDataset> {
    if samples == 0 || features == 0 || classes == 0 {
        return Err(ClientErr::Dataset(format!(
            "synthetic dataset needs positive sizes, got samples={samples} features={features} classes={classes}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let center = Uniform::new(-CENTER_BOX, CENTER_BOX)
        .map_err(|e| ClientErr::Dataset(format!("center distribution: {e}")))?;
    let noise = Normal::new(0.0f32, 1.0)
        .map_err(|e| ClientErr::Dataset(format!("noise distribution: {e}")))?;

    let centers = Array2::from_shape_simple_fn((classes, features), || center.sample(&mut rng));
    let y = Array1::from_shape_fn(samples, |i| (i % classes) as i64);
    let x = Array2::from_shape_fn((samples, features), |(i, j)| {
        centers[[i % classes, j]] + noise.sample(&mut rng)
    });

    LabeledDataset::new(x, y)
}

/// Parses a numeric CSV body, skipping a leading header line if it does not parse.
fn parse_csv(content: &str) -> Result<LabeledDataset> {
    let mut rows = Vec::new();
    let mut labels = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let values = line
            .split(',')
            .map(|v| v.trim().parse::<f32>())
            .collect::<std::result::Result<Vec<_>, _>>();

        let mut values = match values {
            Ok(values) => values,
            Err(_) if i == 0 => continue,
            Err(e) => {
                return Err(ClientErr::Dataset(format!("csv line {i}: {e}")));
            }
        };

        if values.len() < 2 {
            return Err(ClientErr::Dataset(format!(
                "csv line {i}: expected at least one feature and a label, got {} value(s)",
                values.len()
            )));
        }

        let label = values.pop().unwrap_or_default();
        if label.fract() != 0.0 {
            return Err(ClientErr::Dataset(format!(
                "csv line {i}: label {label} is not an integer"
            )));
        }

        rows.push(values);
        labels.push(label as i64);
    }

    LabeledDataset::from_rows(rows, labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn default_source_is_three_class_blobs() {
        let ds = DatasetSource::default().load().unwrap();
        assert_eq!(ds.len(), 150);
        assert_eq!(ds.n_features(), 4);
        assert_eq!(ds.classes(), vec![0, 1, 2]);
    }

    #[test]
    fn blobs_are_deterministic_for_a_seed() {
        let a = DatasetSource::default().load().unwrap();
        let b = DatasetSource::default().load().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn csv_skips_header_and_blank_lines() {
        let ds = parse_csv("a,b,label\n1.0,2.0,0\n\n3.0,4.0,1\n").unwrap();
        assert_eq!(ds.x(), array![[1.0f32, 2.0], [3.0, 4.0]]);
        assert_eq!(ds.y(), array![0i64, 1]);
    }

    #[test]
    fn csv_rejects_fractional_labels() {
        let res = parse_csv("1.0,2.0,0.5\n");
        assert!(matches!(res, Err(ClientErr::Dataset(_))));
    }

    #[test]
    fn csv_rejects_nan_features() {
        let res = parse_csv("x,label\n1.0,0\nnan,1\n2.0,0\n");
        assert!(matches!(res, Err(ClientErr::Dataset(_))));
    }

    #[test]
    fn csv_rejects_infinite_features() {
        for body in ["1.0,0\n-inf,1\n2.0,0\n", "1.0,0\ninf,1\n"] {
            assert!(matches!(parse_csv(body), Err(ClientErr::Dataset(_))));
        }
    }

    #[test]
    fn csv_rejects_garbage_after_first_line() {
        let res = parse_csv("1.0,0\nfoo,1\n");
        assert!(matches!(res, Err(ClientErr::Dataset(_))));
    }

    #[test]
    fn source_deserializes_with_defaults() {
        let source: DatasetSource =
            serde_json::from_str(r#"{ "kind": "synthetic", "samples": 30 }"#).unwrap();

        assert_eq!(
            source,
            DatasetSource::Synthetic {
                samples: 30,
                features: 4,
                classes: 3,
                seed: 42
            }
        );
    }

    #[test]
    fn inline_source_loads_rows() {
        let source = DatasetSource::Inline {
            features: vec![vec![0.0], vec![1.0]],
            labels: vec![5, 7],
        };

        let ds = source.load().unwrap();
        assert_eq!(ds.classes(), vec![5, 7]);
    }
}
