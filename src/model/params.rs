//! Exchange of a forest's tables as an ordered list of arrays.
//!
//! The order is fixed: split features `(trees, internal nodes)`, split
//! thresholds `(trees, internal nodes)`, leaf distributions
//! `(trees, leaves, classes)`.

use ndarray::{Array2, Array3, ArrayD, Ix2, Ix3};

use super::{
    ForestClassifier,
    forest::ForestState,
    tree::{internal_nodes, leaves},
};
use crate::error::{ClientErr, Result};

/// Model parameters as exchanged with the server.
pub type Parameters = Vec<ArrayD<f32>>;

const N_ARRAYS: usize = 3;

/// Fixes the label space and the feature count of `model` and gives it
/// well-defined tables: every split on feature 0 at 0.0 and uniform leaves,
/// so parameters can be exchanged before any training.
///
/// # Errors
/// Returns `ClientErr::Config` if `classes` is empty or `n_features` is zero.
pub fn set_initial_params(
    model: &mut ForestClassifier,
    classes: &[i64],
    n_features: usize,
) -> Result<()> {
    let mut classes = classes.to_vec();
    classes.sort_unstable();
    classes.dedup();

    if classes.is_empty() {
        return Err(ClientErr::Config("the label space must not be empty".into()));
    }
    if n_features == 0 {
        return Err(ClientErr::Config("the model needs at least one feature".into()));
    }

    let (trees, depth, n_classes) = (model.n_estimators(), model.depth(), classes.len());
    let uniform = 1.0 / n_classes as f32;

    model.state = Some(ForestState {
        classes,
        n_features,
        split_features: Array2::zeros((trees, internal_nodes(depth))),
        split_thresholds: Array2::zeros((trees, internal_nodes(depth))),
        leaf_proba: Array3::from_elem((trees, leaves(depth), n_classes), uniform),
    });

    Ok(())
}

/// Returns the expected shape of every parameter array.
pub fn param_shapes(model: &ForestClassifier) -> Result<Vec<Vec<usize>>> {
    let state = model.state()?;
    let (trees, depth) = (model.n_estimators(), model.depth());

    Ok(vec![
        vec![trees, internal_nodes(depth)],
        vec![trees, internal_nodes(depth)],
        vec![trees, leaves(depth), state.classes.len()],
    ])
}

/// Extracts the current tables of `model`.
///
/// # Errors
/// Returns `ClientErr::Uninitialized` before `set_initial_params`.
pub fn get_model_params(model: &ForestClassifier) -> Result<Parameters> {
    let state = model.state()?;

    Ok(vec![
        state.split_features.mapv(|f| f as f32).into_dyn(),
        state.split_thresholds.clone().into_dyn(),
        state.leaf_proba.clone().into_dyn(),
    ])
}

/// Installs `params` as the tables of `model`. Nothing is modified unless
/// every array is valid.
///
/// Split features are rounded to the nearest integer, since aggregated
/// parameters are not guaranteed to be integral.
///
/// # Errors
/// * `ClientErr::ParamsCountMismatch` - `params` does not hold three arrays.
/// * `ClientErr::ParamsShapeMismatch` - an array has the wrong shape.
/// * `ClientErr::InvalidParameter` - a value is non-finite, a split feature is
///   out of range, or a leaf probability is negative.
pub fn set_model_params(model: &mut ForestClassifier, params: &[ArrayD<f32>]) -> Result<()> {
    let expected = param_shapes(model)?;
    if params.len() != N_ARRAYS {
        return Err(ClientErr::ParamsCountMismatch {
            got: params.len(),
            expected: N_ARRAYS,
        });
    }

    for (index, (param, shape)) in params.iter().zip(&expected).enumerate() {
        if param.shape() != shape.as_slice() {
            return Err(ClientErr::ParamsShapeMismatch {
                index,
                got: param.shape().to_vec(),
                expected: shape.clone(),
            });
        }
        if let Some(v) = param.iter().find(|v| !v.is_finite()) {
            return Err(ClientErr::InvalidParameter {
                index,
                detail: format!("non-finite value {v}"),
            });
        }
    }

    let n_features = model.state()?.n_features;
    let features = params[0].view().into_dimensionality::<Ix2>()?;
    if let Some(f) = features
        .iter()
        .map(|f| f.round())
        .find(|&f| f < 0.0 || f >= n_features as f32)
    {
        return Err(ClientErr::InvalidParameter {
            index: 0,
            detail: format!("split feature {f} is outside [0, {n_features})"),
        });
    }

    let leaf_proba = params[2].view().into_dimensionality::<Ix3>()?;
    if let Some(p) = leaf_proba.iter().find(|&&p| p < 0.0) {
        return Err(ClientErr::InvalidParameter {
            index: 2,
            detail: format!("negative leaf probability {p}"),
        });
    }

    let thresholds = params[1].view().into_dimensionality::<Ix2>()?;
    let split_features = features.mapv(|f| f.round() as usize);
    let split_thresholds = thresholds.to_owned();
    let leaf_proba = leaf_proba.to_owned();

    let state = model.state.as_mut().ok_or(ClientErr::Uninitialized)?;
    state.split_features = split_features;
    state.split_thresholds = split_thresholds;
    state.leaf_proba = leaf_proba;

    Ok(())
}
