use std::num::NonZeroUsize;

use log::debug;
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis, Zip};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;

use super::tree::{self, GrownTree};
use crate::{
    error::{ClientErr, Result},
    metrics,
};

/// Depth used when the run configuration leaves `max_depth` unset.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Deepest tree the flattened layout accepts.
pub const MAX_SUPPORTED_DEPTH: usize = 16;

/// The learned tables of a forest, one row (or plane) per tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ForestState {
    pub(crate) classes: Vec<i64>,
    pub(crate) n_features: usize,
    pub(crate) split_features: Array2<usize>,
    pub(crate) split_thresholds: Array2<f32>,
    pub(crate) leaf_proba: Array3<f32>,
}

/// A bagged ensemble of depth-bounded classification trees whose whole state
/// is a fixed set of dense arrays, so it can be exchanged as parameters.
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    n_estimators: NonZeroUsize,
    depth: usize,
    rng: StdRng,
    pub(crate) state: Option<ForestState>,
}

impl ForestClassifier {
    /// Creates an untrained forest. Its parameters stay undefined until
    /// `set_initial_params` fixes the label space and the feature count.
    ///
    /// # Arguments
    /// * `n_estimators` - Number of trees.
    /// * `max_depth` - Split levels per tree, `DEFAULT_MAX_DEPTH` if `None`.
    /// * `seed` - Seed for bootstraps and feature draws, entropy if `None`.
    ///
    /// # Errors
    /// Returns `ClientErr::Config` if `max_depth` exceeds `MAX_SUPPORTED_DEPTH`.
    pub fn new(
        n_estimators: NonZeroUsize,
        max_depth: Option<NonZeroUsize>,
        seed: Option<u64>,
    ) -> Result<Self> {
        let depth = max_depth.map_or(DEFAULT_MAX_DEPTH, NonZeroUsize::get);
        if depth > MAX_SUPPORTED_DEPTH {
            return Err(ClientErr::Config(format!(
                "max_depth {depth} exceeds the supported maximum of {MAX_SUPPORTED_DEPTH}"
            )));
        }

        Ok(Self {
            n_estimators,
            depth,
            rng: generate_rng(seed),
            state: None,
        })
    }

    #[inline]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators.get()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The label space, empty until the parameters are initialized.
    pub fn classes(&self) -> &[i64] {
        match &self.state {
            Some(state) => &state.classes,
            None => &[],
        }
    }

    pub fn n_features(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.n_features)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub(crate) fn state(&self) -> Result<&ForestState> {
        self.state.as_ref().ok_or(ClientErr::Uninitialized)
    }

    /// Maps labels to their position in the label space.
    ///
    /// # Errors
    /// Returns `ClientErr::LabelSpaceMismatch` on the first unknown label.
    pub fn encode_labels(&self, y: ArrayView1<i64>) -> Result<Vec<usize>> {
        let classes = &self.state()?.classes;
        y.iter()
            .map(|&label| {
                classes
                    .binary_search(&label)
                    .map_err(|_| ClientErr::LabelSpaceMismatch { label })
            })
            .collect()
    }

    /// Regrows every tree on bootstrap resamples of `(x, y)`, replacing the
    /// current tables.
    ///
    /// # Errors
    /// Returns an error if the model is uninitialized, if `x` and `y` disagree
    /// or are empty, if `x` has the wrong feature count, or if `y` holds a
    /// label outside the label space.
    pub fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<i64>) -> Result<()> {
        self.check_features(x)?;
        if x.nrows() != y.len() || x.nrows() == 0 {
            return Err(ClientErr::Dataset(format!(
                "cannot fit on {} feature row(s) and {} label(s)",
                x.nrows(),
                y.len()
            )));
        }

        let y = self.encode_labels(y)?;
        let n_classes = self.classes().len();
        let depth = self.depth;
        let max_features = (x.ncols() as f64).sqrt() as usize;

        let seeds: Vec<u64> = (0..self.n_estimators()).map(|_| self.rng.random()).collect();
        let trees: Vec<GrownTree> = seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                tree::grow_tree(x, &y, n_classes, depth, max_features, &mut rng)
            })
            .collect();

        let state = self.state.as_mut().ok_or(ClientErr::Uninitialized)?;
        for (t, grown) in trees.into_iter().enumerate() {
            state.split_features.row_mut(t).assign(&grown.features);
            state.split_thresholds.row_mut(t).assign(&grown.thresholds);
            state.leaf_proba.index_axis_mut(Axis(0), t).assign(&grown.leaves);
        }

        debug!(
            trees = self.n_estimators(),
            depth = depth,
            samples = y.len();
            "forest fitted"
        );

        Ok(())
    }

    /// Returns the mean leaf distribution over all trees, one row per sample
    /// and one column per class of the label space.
    pub fn predict_proba(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.check_features(x)?;
        let state = self.state()?;
        let n_trees = self.n_estimators() as f32;

        let mut proba = Array2::<f32>::zeros((x.nrows(), state.classes.len()));
        Zip::from(proba.rows_mut())
            .and(x.rows())
            .par_for_each(|mut out, sample| {
                for t in 0..state.split_features.nrows() {
                    let leaf = tree::route(
                        state.split_features.row(t),
                        state.split_thresholds.row(t),
                        sample,
                    );
                    out += &state.leaf_proba.slice(ndarray::s![t, leaf, ..]);
                }
                out /= n_trees;
            });

        Ok(proba)
    }

    /// Predicts the most probable label of every sample, ties going to the
    /// smallest label.
    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<i64>> {
        let proba = self.predict_proba(x)?;
        let classes = &self.state()?.classes;

        Ok(proba
            .rows()
            .into_iter()
            .map(|row| classes[argmax(row)])
            .collect())
    }

    /// Mean accuracy on `(x, y)`.
    pub fn score(&self, x: ArrayView2<f32>, y: ArrayView1<i64>) -> Result<f64> {
        let y_pred = self.predict(x)?;
        Ok(metrics::accuracy(y, y_pred.view()))
    }

    fn check_features(&self, x: ArrayView2<f32>) -> Result<()> {
        let expected = self.state()?.n_features;
        if x.ncols() != expected {
            return Err(ClientErr::Dataset(format!(
                "samples have {} feature(s), the model expects {expected}",
                x.ncols()
            )));
        }
        Ok(())
    }
}

fn argmax(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &p)| {
            if p > max { (i, p) } else { (best, max) }
        })
        .0
}

fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::set_initial_params;
    use ndarray::array;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn blobs() -> (Array2<f32>, Array1<i64>) {
        let x = Array2::from_shape_fn((60, 2), |(i, j)| {
            let center = if i % 2 == 0 { -5.0 } else { 5.0 };
            center + ((i * 7 + j * 3) % 10) as f32 * 0.1
        });
        let y = Array1::from_shape_fn(60, |i| (i % 2) as i64);
        (x, y)
    }

    fn fitted(seed: u64) -> ForestClassifier {
        let (x, y) = blobs();
        let mut model = ForestClassifier::new(nz(5), Some(nz(3)), Some(seed)).unwrap();
        set_initial_params(&mut model, &[0, 1], 2).unwrap();
        model.fit(x.view(), y.view()).unwrap();
        model
    }

    #[test]
    fn depth_defaults_when_unset() {
        let model = ForestClassifier::new(nz(2), None, Some(0)).unwrap();
        assert_eq!(model.depth(), DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn excessive_depth_is_rejected() {
        let res = ForestClassifier::new(nz(2), Some(nz(MAX_SUPPORTED_DEPTH + 1)), Some(0));
        assert!(matches!(res, Err(ClientErr::Config(_))));
    }

    #[test]
    fn uninitialized_model_cannot_predict() {
        let model = ForestClassifier::new(nz(2), None, Some(0)).unwrap();
        let res = model.predict_proba(array![[1.0f32]].view());
        assert!(matches!(res, Err(ClientErr::Uninitialized)));
    }

    #[test]
    fn initial_model_predicts_uniformly() {
        let mut model = ForestClassifier::new(nz(3), Some(nz(2)), Some(0)).unwrap();
        set_initial_params(&mut model, &[0, 1, 2, 3], 2).unwrap();

        let proba = model.predict_proba(array![[0.0f32, 1.0], [5.0, -3.0]].view()).unwrap();
        for p in proba.iter() {
            assert!((p - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn fit_learns_separable_blobs() {
        let (x, y) = blobs();
        let model = fitted(1);
        assert_eq!(model.score(x.view(), y.view()).unwrap(), 1.0);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (x, _) = blobs();
        let proba = fitted(2).predict_proba(x.view()).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn fit_is_deterministic_for_a_seed() {
        assert_eq!(fitted(9).state, fitted(9).state);
    }

    #[test]
    fn fit_rejects_unknown_labels() {
        let mut model = ForestClassifier::new(nz(2), Some(nz(2)), Some(0)).unwrap();
        set_initial_params(&mut model, &[0, 1], 1).unwrap();

        let res = model.fit(array![[0.0f32], [1.0]].view(), array![0i64, 7].view());
        assert!(matches!(res, Err(ClientErr::LabelSpaceMismatch { label: 7 })));
    }

    #[test]
    fn wrong_feature_count_is_rejected() {
        let model = fitted(4);
        let res = model.predict(array![[0.0f32, 1.0, 2.0]].view());
        assert!(matches!(res, Err(ClientErr::Dataset(_))));
    }

    #[test]
    fn argmax_prefers_first_on_ties() {
        assert_eq!(argmax(array![0.25f32, 0.25, 0.5, 0.5].view()), 2);
        assert_eq!(argmax(array![0.5f32, 0.5].view()), 0);
    }
}
