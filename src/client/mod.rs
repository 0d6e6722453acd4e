mod app;
mod forest_client;

use std::collections::BTreeMap;

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::{error::Result, model::Parameters};

pub use app::{ClientApp, app};
pub use forest_client::{ForestClient, HOLDOUT, client_fn};

/// A loosely typed configuration or metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Returns the value as a float if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Named metrics reported back to the server.
pub type Metrics = BTreeMap<String, Scalar>;

/// Per-round instructions sent by the server. Read-only to clients.
pub type RoundConfig = BTreeMap<String, Scalar>;

/// Result of a local training pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FitRes {
    pub parameters: Parameters,
    /// Training examples used, the weight of this update in aggregation.
    pub num_examples: usize,
    pub metrics: Metrics,
}

/// Result of a local evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluateRes {
    pub loss: f64,
    pub num_examples: usize,
    pub metrics: Metrics,
}

/// The callbacks an external client runtime invokes once per federated round.
///
/// Calls are sequential; every call installs the given parameters before
/// doing its work, so each one only depends on its arguments and the local data.
pub trait Client {
    /// Returns the current local parameters.
    fn get_parameters(&mut self, config: &RoundConfig) -> Result<Parameters>;

    /// Trains locally starting from `parameters`.
    fn fit(&mut self, parameters: &[ArrayD<f32>], config: &RoundConfig) -> Result<FitRes>;

    /// Evaluates `parameters` on the local test split.
    fn evaluate(&mut self, parameters: &[ArrayD<f32>], config: &RoundConfig)
    -> Result<EvaluateRes>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_config_accepts_loosely_typed_values() {
        let config: RoundConfig = serde_json::from_str(
            r#"{ "local-epochs": 2, "lr": 0.5, "proximal": true, "strategy": "fedavg" }"#,
        )
        .unwrap();

        assert_eq!(config["local-epochs"], Scalar::Int(2));
        assert_eq!(config["lr"], Scalar::Float(0.5));
        assert_eq!(config["proximal"], Scalar::Bool(true));
        assert_eq!(config["strategy"], Scalar::Str("fedavg".into()));
    }

    #[test]
    fn only_numbers_convert_to_floats() {
        assert_eq!(Scalar::Int(3).as_f64(), Some(3.0));
        assert_eq!(Scalar::from(0.25).as_f64(), Some(0.25));
        assert_eq!(Scalar::Bool(true).as_f64(), None);
        assert_eq!(Scalar::Str("1.0".into()).as_f64(), None);
    }
}
