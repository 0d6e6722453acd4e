use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{ClientErr, Result};

/// An in-memory labeled dataset: one feature row per sample and an integer class label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    x: Array2<f32>,
    y: Array1<i64>,
}

impl LabeledDataset {
    /// Creates a new dataset from owned buffers.
    ///
    /// # Errors
    /// Returns `ClientErr::Dataset` if `x` and `y` disagree on the number of
    /// samples, or if there are no samples or no features.
    pub fn new(x: Array2<f32>, y: Array1<i64>) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(ClientErr::Dataset(format!(
                "features have {} rows but there are {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 {
            return Err(ClientErr::Dataset("dataset must be non-empty".into()));
        }
        if x.ncols() == 0 {
            return Err(ClientErr::Dataset("samples must have at least one feature".into()));
        }
        if let Some(((row, col), v)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(ClientErr::Dataset(format!(
                "sample {row} has non-finite feature {col}: {v}"
            )));
        }

        Ok(Self { x, y })
    }

    /// Builds a dataset from row-major feature rows.
    pub fn from_rows(rows: Vec<Vec<f32>>, labels: Vec<i64>) -> Result<Self> {
        let n_features = rows.first().map(Vec::len).unwrap_or_default();

        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_features) {
            return Err(ClientErr::Dataset(format!(
                "row {i} has {} features, expected {n_features}",
                row.len()
            )));
        }

        let n_samples = rows.len();
        let data = rows.into_iter().flatten().collect();
        let x = Array2::from_shape_vec((n_samples, n_features), data)?;
        Self::new(x, Array1::from_vec(labels))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.y.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    #[inline]
    pub fn x(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    #[inline]
    pub fn y(&self) -> ArrayView1<'_, i64> {
        self.y.view()
    }

    /// Returns the sorted set of distinct labels.
    pub fn classes(&self) -> Vec<i64> {
        let mut classes = self.y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        classes
    }

    /// Gathers the samples at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> (Array2<f32>, Array1<i64>) {
        (
            self.x.select(Axis(0), indices),
            self.y.select(Axis(0), indices),
        )
    }
}
