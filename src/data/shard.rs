use std::num::NonZeroUsize;
use std::ops::Range;

use crate::error::{ClientErr, Result};

/// Splits `total` samples among `num_partitions` and returns the range owned by `partition_id`.
///
/// Properties:
/// - Ranges are contiguous, disjoint and cover `[0..total)`.
/// - Sizes differ by at most 1 (balanced partition).
pub fn shard_range(total: usize, partition_id: usize, num_partitions: NonZeroUsize) -> Range<usize> {
    let num_partitions = num_partitions.get();
    debug_assert!(
        partition_id < num_partitions,
        "partition {partition_id} is out of range for {num_partitions} partition(s)"
    );

    let base = total / num_partitions;
    let rem = total % num_partitions;

    let start = partition_id * base + partition_id.min(rem);
    let extra = if partition_id < rem { 1 } else { 0 };
    let end = start + base + extra;

    start..end
}

/// Identifies the shard of a global dataset owned by one client, and how much
/// of it is held out for evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartitionSpec {
    partition_id: usize,
    num_partitions: NonZeroUsize,
    holdout: f64,
}

impl PartitionSpec {
    /// Creates a new `PartitionSpec`.
    ///
    /// # Errors
    /// Returns `ClientErr::InvalidPartition` if `partition_id` is out of range
    /// and `ClientErr::InvalidHoldout` unless `0 < holdout < 1`.
    pub fn new(partition_id: usize, num_partitions: usize, holdout: f64) -> Result<Self> {
        let invalid = ClientErr::InvalidPartition {
            partition_id,
            num_partitions,
        };

        let Some(nonzero) = NonZeroUsize::new(num_partitions) else {
            return Err(invalid);
        };
        if partition_id >= num_partitions {
            return Err(invalid);
        }
        if !(holdout > 0.0 && holdout < 1.0) {
            return Err(ClientErr::InvalidHoldout(holdout));
        }

        Ok(Self {
            partition_id,
            num_partitions: nonzero,
            holdout,
        })
    }

    #[inline]
    pub fn partition_id(&self) -> usize {
        self.partition_id
    }

    #[inline]
    pub fn num_partitions(&self) -> usize {
        self.num_partitions.get()
    }

    #[inline]
    pub fn holdout(&self) -> f64 {
        self.holdout
    }

    #[inline]
    pub fn range(&self, total: usize) -> Range<usize> {
        shard_range(total, self.partition_id, self.num_partitions)
    }

    /// Number of test samples for a shard of `len` samples, rounded up.
    pub fn test_len(&self, len: usize) -> usize {
        (len as f64 * self.holdout).ceil() as usize
    }
}
