use cohort_core::{MarkovController, Model, RunConfig, RunResults, F};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rng::ParameterRng;
use crate::stats::PsaSummary;

/// Probabilistic sensitivity analysis settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PsaConfig {
    pub iterations: usize,
    pub global_seed: u64,
    pub use_parallel: bool, // evaluate iterations on the rayon pool
}

impl Default for PsaConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            global_seed: 42,
            use_parallel: true,
        }
    }
}

impl PsaConfig {
    pub fn new(iterations: usize, global_seed: u64) -> Self {
        Self { iterations, global_seed, ..Self::default() }
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PsaError {
    #[error("PSA iteration {id} failed: {source}")]
    Iteration {
        id: usize,
        #[source]
        source: cohort_core::Error,
    },
}

/// One resampled realization and its full run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PsaIteration {
    pub id: usize,
    pub results: RunResults,
}

/// All iterations of a PSA, ordered by iteration id
#[derive(Clone, Debug)]
pub struct PsaEnsemble {
    pub iterations: Vec<PsaIteration>,
    pub config: PsaConfig,
}

impl PsaEnsemble {
    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }

    /// Cumulative discounted total of `variable` per iteration
    pub fn totals(&self, variable: &str) -> Vec<F> {
        self.iterations
            .iter()
            .map(|it| it.results.totals().get(variable).unwrap_or(0.0))
            .collect()
    }

    pub fn summary(&self) -> PsaSummary {
        PsaSummary::from_ensemble(self)
    }
}

/// Runs independent resample + verify + run iterations over a shared model.
///
/// The model is never mutated: each iteration resamples its own copy with a
/// stream derived from `(global_seed, id)`, so results are independent of the
/// thread count and of evaluation order.
pub struct PsaRunner {
    pub run: RunConfig,
    pub psa: PsaConfig,
}

impl PsaRunner {
    pub fn new(run: RunConfig, psa: PsaConfig) -> Self {
        Self { run, psa }
    }

    pub fn run(&self, model: &Model) -> Result<PsaEnsemble, PsaError> {
        if self.psa.iterations == 0 {
            log::warn!("PSA requested with zero iterations");
        }
        let ids = 0..self.psa.iterations;
        let iterations: Vec<PsaIteration> = if self.psa.use_parallel {
            ids.into_par_iter().map(|id| self.run_iteration(model, id)).collect::<Result<Vec<_>, _>>()?
        } else {
            ids.map(|id| self.run_iteration(model, id)).collect::<Result<Vec<_>, _>>()?
        };

        log::info!(
            "PSA finished: {} iterations of {} cycles (seed {})",
            iterations.len(),
            self.run.total_cycles,
            self.psa.global_seed
        );

        Ok(PsaEnsemble {
            iterations,
            config: self.psa.clone(),
        })
    }

    pub fn run_iteration(&self, model: &Model, id: usize) -> Result<PsaIteration, PsaError> {
        let fail = |source: cohort_core::Error| PsaError::Iteration { id, source };

        let mut local = model.clone();
        let mut rng = ParameterRng::from_iteration_id(self.psa.global_seed, id as u64);
        local.resample(&mut rng).map_err(|e| fail(e.into()))?;

        let mut controller = MarkovController::new(&local, self.run.clone());
        controller.verify().map_err(|e| fail(e.into()))?;
        controller.run().map_err(fail)?;

        log::debug!("PSA iteration {} done", id);
        Ok(PsaIteration {
            id,
            results: controller.into_results(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_core::{CountingMethod, Parameter, Probability, Rewards};

    fn sampled_model(p_die: Parameter) -> Model {
        let mut b = Model::builder();
        let well = b.add_state("well", 1.0, Rewards::new().with("cost", Parameter::gamma(100.0, 4.0, 25.0)));
        let dead = b.add_state("dead", 0.0, Rewards::new());
        b.add_transition(well, "die", dead, p_die, Rewards::new());
        b.add_transition(well, "live", well, Probability::Complement, Rewards::new());
        b.add_transition(dead, "stay", dead, 1.0, Rewards::new());
        b.build()
    }

    #[test]
    fn test_iterations_differ_and_model_untouched() {
        let model = sampled_model(Parameter::beta(0.1, 2.0, 18.0));
        let runner = PsaRunner::new(
            RunConfig::new(5, CountingMethod::Half, 0.03),
            PsaConfig::new(8, 7).with_parallel(false),
        );
        let ensemble = runner.run(&model).unwrap();

        assert_eq!(ensemble.len(), 8);
        let costs = ensemble.totals("cost");
        assert!(costs.windows(2).any(|w| w[0] != w[1]));

        // Shared model still holds its point estimates
        let die = &model.transitions()[0];
        assert_eq!(die.probability.value(0).unwrap(), 0.1);
        assert!(matches!(&die.probability, Probability::Sampled(p) if p.realization().is_none()));
    }

    #[test]
    fn test_iteration_is_reproducible() {
        let model = sampled_model(Parameter::beta(0.1, 2.0, 18.0));
        let runner = PsaRunner::new(RunConfig::new(4, CountingMethod::Start, 0.0), PsaConfig::new(3, 99));
        let a = runner.run_iteration(&model, 2).unwrap();
        let b = runner.run_iteration(&model, 2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_out_of_range_draw_aborts_iteration() {
        // Normal draws around 0.5 with a huge spread leave [0, 1] almost surely
        let model = sampled_model(Parameter::sampled(
            0.5,
            cohort_core::Distribution::Normal { mean: 0.5, std_dev: 50.0 },
        ));
        let runner = PsaRunner::new(
            RunConfig::new(3, CountingMethod::Half, 0.0),
            PsaConfig::new(4, 1).with_parallel(false),
        );
        let err = runner.run(&model).unwrap_err();
        let PsaError::Iteration { source, .. } = err;
        assert!(matches!(source, cohort_core::Error::Configuration(_)));
    }
}
