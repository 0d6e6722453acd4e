use std::env;

use anyhow::Context as _;
use log::info;

use our_federation::{LocalSession, app, config::Context};

const DEFAULT_ROUNDS: usize = 3;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .context("usage: our-federation <context.json>")?;

    let rounds = match env::var("ROUNDS") {
        Ok(v) => v.parse().with_context(|| format!("invalid ROUNDS '{v}'"))?,
        Err(_) => DEFAULT_ROUNDS,
    };

    let context = Context::from_file(&path)?;
    let client = app().build(&context)?;

    let reports = LocalSession::new(client).run(rounds)?;
    for report in &reports {
        info!(
            "round {}: loss={:.4} accuracy={:?} fit_examples={} eval_examples={}",
            report.round, report.loss, report.accuracy, report.fit_examples, report.eval_examples
        );
    }

    Ok(())
}
