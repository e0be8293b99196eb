use crate::config::RunConfig;
use crate::controller::MarkovController;
use crate::error::Result;
use crate::graph::Model;
use crate::results::RunResults;

/// One model under one counting method and discount rate.
///
/// Comparing strategies (e.g. screening vs. no screening) is left to the
/// caller; each strategy runs independently.
#[derive(Clone, Debug)]
pub struct Strategy {
    pub name: String,
    pub model: Model,
    pub config: RunConfig,
}

impl Strategy {
    pub fn new(name: &str, model: Model, config: RunConfig) -> Self {
        Self { name: name.to_string(), model, config }
    }

    pub fn run(&self) -> Result<RunResults> {
        log::info!("running strategy '{}' for {} cycles", self.name, self.config.total_cycles);
        let mut controller = MarkovController::new(&self.model, self.config.clone());
        controller.run()?;
        Ok(controller.into_results())
    }
}
