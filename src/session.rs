use log::info;

use crate::{
    client::{Client, RoundConfig},
    error::Result,
};

/// Outcome of one local round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub round: usize,
    pub fit_examples: usize,
    pub eval_examples: usize,
    pub loss: f64,
    pub accuracy: Option<f64>,
}

/// Drives a single client through rounds of fit and evaluate the way a client
/// runtime would, feeding each round the parameters the previous one produced.
/// No aggregation takes place.
pub struct LocalSession<C: Client> {
    client: C,
    config: RoundConfig,
}

impl<C: Client> LocalSession<C> {
    /// Creates a new `LocalSession` with an empty round configuration.
    pub fn new(client: C) -> Self {
        Self {
            client,
            config: RoundConfig::new(),
        }
    }

    /// Runs `rounds` rounds.
    ///
    /// # Returns
    /// One report per round, in order.
    ///
    /// # Errors
    /// Stops at the first failing call and returns its error.
    pub fn run(&mut self, rounds: usize) -> Result<Vec<RoundReport>> {
        let mut parameters = self.client.get_parameters(&self.config)?;
        let mut reports = Vec::with_capacity(rounds);

        for round in 1..=rounds {
            let fit = self.client.fit(&parameters, &self.config)?;
            let eval = self.client.evaluate(&fit.parameters, &self.config)?;
            parameters = fit.parameters;

            let accuracy = eval.metrics.get("accuracy").and_then(|v| v.as_f64());
            info!(
                round = round,
                loss = eval.loss,
                examples = fit.num_examples;
                "round finished"
            );

            reports.push(RoundReport {
                round,
                fit_examples: fit.num_examples,
                eval_examples: eval.num_examples,
                loss: eval.loss,
                accuracy,
            });
        }

        Ok(reports)
    }

    /// Consumes the session and returns its client.
    pub fn into_inner(self) -> C {
        self.client
    }
}
