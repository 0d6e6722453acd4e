pub mod forest;
pub mod params;
pub mod tree;

pub use forest::{DEFAULT_MAX_DEPTH, ForestClassifier, MAX_SUPPORTED_DEPTH};
pub use params::{Parameters, get_model_params, set_initial_params, set_model_params};
