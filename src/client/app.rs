use super::{Client, ForestClient, client_fn};
use crate::{config::Context, error::Result};

/// The entry point an external client runtime is handed: a factory that
/// turns a node's `Context` into a ready `Client`.
pub struct ClientApp<F> {
    client_fn: F,
}

impl<F> ClientApp<F> {
    /// Creates a new `ClientApp` around `client_fn`.
    pub fn new(client_fn: F) -> Self {
        Self { client_fn }
    }

    /// Builds the client for the node described by `context`.
    ///
    /// # Errors
    /// Returns whatever the factory fails with.
    pub fn build<C>(&self, context: &Context) -> Result<C>
    where
        F: Fn(&Context) -> Result<C>,
        C: Client,
    {
        (self.client_fn)(context)
    }
}

/// The forest client app.
pub fn app() -> ClientApp<fn(&Context) -> Result<ForestClient>> {
    ClientApp::new(client_fn as fn(&Context) -> Result<ForestClient>)
}
