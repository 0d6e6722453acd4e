use std::{fs, num::NonZeroUsize, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    data::DatasetSource,
    error::{ClientErr, Result},
};

/// Per-node settings assigned by the deployment, fixed for the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeConfig {
    pub partition_id: usize,
    pub num_partitions: NonZeroUsize,
    #[serde(default)]
    pub dataset: DatasetSource,
}

/// Hyperparameters for the local classifier, shared by every node of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub n_estimators: NonZeroUsize,
    pub max_depth: Option<NonZeroUsize>,
    pub seed: Option<u64>,
}

impl RunConfig {
    /// Creates a run configuration with no depth limit and no fixed seed.
    pub fn new(n_estimators: NonZeroUsize) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            seed: None,
        }
    }
}

/// Everything a client factory needs to build one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub node_config: NodeConfig,
    pub run_config: RunConfig,
}

impl Context {
    /// Creates a validated `Context`.
    ///
    /// # Errors
    /// Returns `ClientErr::InvalidPartition` if `partition_id` does not index
    /// one of the `num_partitions` partitions.
    pub fn new(node_config: NodeConfig, run_config: RunConfig) -> Result<Self> {
        let context = Self {
            node_config,
            run_config,
        };
        context.validate()?;
        Ok(context)
    }

    /// Parses and validates a context from its JSON representation.
    pub fn from_json(content: &str) -> Result<Self> {
        let context: Self = serde_json::from_str(content)?;
        context.validate()?;
        Ok(context)
    }

    /// Reads a context from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ClientErr::Config(format!("cannot read '{}': {e}", path.display()))
        })?;

        Self::from_json(&content)
    }

    fn validate(&self) -> Result<()> {
        let NodeConfig {
            partition_id,
            num_partitions,
            ..
        } = self.node_config;

        if partition_id >= num_partitions.get() {
            return Err(ClientErr::InvalidPartition {
                partition_id,
                num_partitions: num_partitions.get(),
            });
        }

        Ok(())
    }
}
