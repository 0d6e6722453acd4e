use log::debug;
use ndarray::{Array1, Array2};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::{DatasetSource, PartitionSpec};
use crate::error::{ClientErr, Result};

/// Seed of the permutation that assigns samples to partitions.
pub const PARTITION_SEED: u64 = 42;

/// Seed of the permutation that splits a partition into train and test.
pub const SPLIT_SEED: u64 = 42;

/// The four local splits a client trains and evaluates on, plus the label
/// space of the whole federated dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Splits {
    pub x_train: Array2<f32>,
    pub x_test: Array2<f32>,
    pub y_train: Array1<i64>,
    pub y_test: Array1<i64>,
    pub classes: Vec<i64>,
}

impl Splits {
    #[inline]
    pub fn n_features(&self) -> usize {
        self.x_train.ncols()
    }
}

/// Loads the train/test splits of one IID partition of `source`.
///
/// The global dataset is shuffled with `PARTITION_SEED`, cut into
/// `num_partitions` balanced contiguous shards, and the selected shard is
/// shuffled again with `SPLIT_SEED` before `holdout` of it (rounded up) is
/// set aside for testing. The same arguments always produce the same splits.
///
/// # Errors
/// Returns an error if the partition or holdout are invalid, if the source
/// cannot be loaded, or if the shard is too small to yield both splits.
pub fn load_data(
    source: &DatasetSource,
    partition_id: usize,
    num_partitions: usize,
    holdout: f64,
) -> Result<Splits> {
    let spec = PartitionSpec::new(partition_id, num_partitions, holdout)?;
    let dataset = source.load()?;

    let mut order: Vec<usize> = (0..dataset.len()).collect();
    order.shuffle(&mut StdRng::seed_from_u64(PARTITION_SEED));

    let mut shard = order[spec.range(order.len())].to_vec();
    shard.shuffle(&mut StdRng::seed_from_u64(SPLIT_SEED));

    let n_test = spec.test_len(shard.len());
    if n_test == 0 || n_test >= shard.len() {
        return Err(ClientErr::Dataset(format!(
            "partition {partition_id} has {} sample(s), too few for a {holdout} holdout",
            shard.len()
        )));
    }

    let (test_idx, train_idx) = shard.split_at(n_test);
    let (x_train, y_train) = dataset.select(train_idx);
    let (x_test, y_test) = dataset.select(test_idx);

    debug!(
        partition_id = partition_id,
        train = train_idx.len(),
        test = test_idx.len();
        "partition loaded"
    );

    Ok(Splits {
        x_train,
        x_test,
        y_train,
        y_test,
        classes: dataset.classes(),
    })
}
