use ndarray::{ArrayView1, ArrayView2};

/// Probabilities are clipped to `[EPS, 1 - EPS]` before taking logs.
pub const EPS: f64 = 1e-15;

/// Mean negative log-likelihood of the true classes.
///
/// Every row of `proba` is clipped and renormalized first, so the result is
/// finite for any non-negative input. `y_true` holds column indices into
/// `proba`; an empty input has a loss of zero.
pub fn log_loss(y_true: &[usize], proba: ArrayView2<f32>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }

    let total: f64 = y_true
        .iter()
        .zip(proba.rows())
        .map(|(&class, row)| {
            let clipped = row.mapv(|p| (p as f64).clamp(EPS, 1.0 - EPS));
            let p = clipped[class] / clipped.sum();
            -p.ln()
        })
        .sum();

    total / y_true.len() as f64
}

/// Fraction of matching labels, zero for empty inputs.
pub fn accuracy(y_true: ArrayView1<i64>, y_pred: ArrayView1<i64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }

    let hits = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(a, b)| a == b)
        .count();

    hits as f64 / y_true.len() as f64
}
