pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod model;
pub mod session;

pub use client::{Client, ClientApp, ForestClient, app, client_fn};
pub use config::{Context, NodeConfig, RunConfig};
pub use error::{ClientErr, Result};
pub use session::LocalSession;
