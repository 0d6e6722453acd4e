//! Growing of a single depth-bounded classification tree.
//!
//! Trees are stored as complete binary trees in heap order: internal node `i`
//! has children `2i + 1` and `2i + 2`, and the `2^depth` nodes past the last
//! internal one are the leaves. A sample goes left when
//! `x[feature] <= threshold`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::{Rng, rngs::StdRng, seq::index};

/// The flattened tables of one grown tree.
#[derive(Debug, Clone)]
pub struct GrownTree {
    pub features: Array1<usize>,
    pub thresholds: Array1<f32>,
    pub leaves: Array2<f32>,
}

/// Number of internal nodes of a complete tree of `depth` split levels.
#[inline]
pub fn internal_nodes(depth: usize) -> usize {
    (1 << depth) - 1
}

/// Number of leaves of a complete tree of `depth` split levels.
#[inline]
pub fn leaves(depth: usize) -> usize {
    1 << depth
}

/// Walks a tree and returns the index of the leaf `sample` falls into.
pub fn route(
    features: ArrayView1<usize>,
    thresholds: ArrayView1<f32>,
    sample: ArrayView1<f32>,
) -> usize {
    let n_internal = features.len();
    let mut node = 0;

    while node < n_internal {
        node = if sample[features[node]] <= thresholds[node] {
            2 * node + 1
        } else {
            2 * node + 2
        };
    }

    node - n_internal
}

/// Grows one tree on a bootstrap resample of `(x, y)`.
///
/// # Arguments
/// * `x` - Training features, one row per sample.
/// * `y` - Class index of every row of `x`.
/// * `n_classes` - Size of the class space.
/// * `depth` - Number of split levels.
/// * `max_features` - Candidate features drawn per node.
/// * `rng` - Source of the bootstrap and of the feature draws.
pub fn grow_tree(
    x: ArrayView2<f32>,
    y: &[usize],
    n_classes: usize,
    depth: usize,
    max_features: usize,
    rng: &mut StdRng,
) -> GrownTree {
    let n = y.len();
    let rows: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();

    let mut builder = TreeBuilder {
        x,
        y,
        n_classes,
        depth,
        max_features: max_features.clamp(1, x.ncols()),
        rng,
        tree: GrownTree {
            features: Array1::zeros(internal_nodes(depth)),
            thresholds: Array1::zeros(internal_nodes(depth)),
            leaves: Array2::zeros((leaves(depth), n_classes)),
        },
    };

    let uniform = Array1::from_elem(n_classes, 1.0 / n_classes as f32);
    builder.build(0, 0, rows, &uniform);
    builder.tree
}

struct TreeBuilder<'a> {
    x: ArrayView2<'a, f32>,
    y: &'a [usize],
    n_classes: usize,
    depth: usize,
    max_features: usize,
    rng: &'a mut StdRng,
    tree: GrownTree,
}

impl TreeBuilder<'_> {
    fn build(&mut self, node: usize, level: usize, rows: Vec<usize>, fallback: &Array1<f32>) {
        let counts = self.class_counts(&rows);
        let dist = if rows.is_empty() {
            fallback.clone()
        } else {
            counts.mapv(|c| c as f32 / rows.len() as f32)
        };

        if level == self.depth {
            let leaf = node - internal_nodes(self.depth);
            self.tree.leaves.row_mut(leaf).assign(&dist);
            return;
        }

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let split = if pure { None } else { self.best_split(&rows) };

        let Some((feature, threshold)) = split else {
            self.fill_subtree(node, level, &dist);
            return;
        };

        self.tree.features[node] = feature;
        self.tree.thresholds[node] = threshold;

        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.x[[r, feature]] <= threshold);

        self.build(2 * node + 1, level + 1, left, &dist);
        self.build(2 * node + 2, level + 1, right, &dist);
    }

    /// Gives every leaf below `node` the same distribution.
    fn fill_subtree(&mut self, node: usize, level: usize, dist: &Array1<f32>) {
        let n_internal = internal_nodes(self.depth);
        let mut first = node;
        while first < n_internal {
            first = 2 * first + 1;
        }

        let first = first - n_internal;
        for leaf in first..first + leaves(self.depth - level) {
            self.tree.leaves.row_mut(leaf).assign(dist);
        }
    }

    fn class_counts(&self, rows: &[usize]) -> Array1<usize> {
        let mut counts = Array1::zeros(self.n_classes);
        for &r in rows {
            counts[self.y[r]] += 1;
        }
        counts
    }

    /// Finds the split with the lowest weighted gini impurity among a random
    /// subset of features, falling back to every feature when none of the
    /// drawn ones can separate the rows.
    fn best_split(&mut self, rows: &[usize]) -> Option<(usize, f32)> {
        let n_features = self.x.ncols();
        let drawn = index::sample(&mut *self.rng, n_features, self.max_features).into_vec();

        self.best_split_among(rows, &drawn).or_else(|| {
            let all: Vec<usize> = (0..n_features).collect();
            self.best_split_among(rows, &all)
        })
    }

    fn best_split_among(&self, rows: &[usize], features: &[usize]) -> Option<(usize, f32)> {
        let mut best: Option<(f32, usize, f32)> = None;

        for &feature in features {
            let Some((impurity, threshold)) = self.best_threshold(rows, feature) else {
                continue;
            };

            if best.is_none_or(|(b, _, _)| impurity < b) {
                best = Some((impurity, feature, threshold));
            }
        }

        best.map(|(_, feature, threshold)| (feature, threshold))
    }

    fn best_threshold(&self, rows: &[usize], feature: usize) -> Option<(f32, f32)> {
        let mut values: Vec<(f32, usize)> = rows
            .iter()
            .map(|&r| (self.x[[r, feature]], self.y[r]))
            .collect();
        values.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = values.len();
        let mut left = vec![0usize; self.n_classes];
        let mut right = vec![0usize; self.n_classes];
        for &(_, class) in &values {
            right[class] += 1;
        }

        let mut best: Option<(f32, f32)> = None;

        for i in 0..n - 1 {
            let (value, class) = values[i];
            left[class] += 1;
            right[class] -= 1;

            let next = values[i + 1].0;
            if value >= next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n - n_left;
            let impurity = (n_left as f32 * gini(&left, n_left)
                + n_right as f32 * gini(&right, n_right))
                / n as f32;

            if best.is_none_or(|(b, _)| impurity < b) {
                let mut threshold = value + (next - value) / 2.0;
                if threshold >= next {
                    threshold = value;
                }
                best = Some((impurity, threshold));
            }
        }

        best
    }
}

fn gini(counts: &[usize], total: usize) -> f32 {
    let total = total as f32;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f32 / total;
            p * p
        })
        .sum::<f32>()
}
