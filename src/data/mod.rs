pub mod dataset;
pub mod loader;
pub mod shard;
pub mod source;

pub use dataset::LabeledDataset;
pub use loader::{Splits, load_data};
pub use shard::{PartitionSpec, shard_range};
pub use source::DatasetSource;
