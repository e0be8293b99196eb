use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::error::{ComputationError, ConfigurationError, Error, Result};
use crate::forward::Report;
use crate::graph::{Model, StateId};
use crate::results::{CycleRecord, RunResults};
use crate::rewards::Outcomes;
use crate::verify::{load_initial_distribution, verify};
use crate::F;

const MASS_DRIFT_WARNING: F = 1e-6;

/// Lifecycle of a controller; only `verify()` leaves `NotInitialized`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    NotInitialized,
    Ready,
    Running,
    Finished,
}

/// Drives the cycle loop for one run over a borrowed, read-only model.
///
/// Per cycle: forward every state, collect the reports into
/// `next_cycle_start_prob`, weight every reward by the counting method,
/// discount, record, then roll the accumulator into `state_probabilities`.
///
/// State rewards use the state's start and end mass. Path rewards (chance
/// nodes and transitions) use the mass that followed the same path in the
/// previous cycle and in this one, with zero before cycle 0.
pub struct MarkovController<'m> {
    model: &'m Model,
    config: RunConfig,
    phase: Phase,
    cycle: usize,
    state_probabilities: Vec<F>,
    next_cycle_start_prob: Vec<Vec<F>>, // per destination, cleared every cycle
    previous_path_mass: Vec<Vec<F>>,    // per source state, in report order
    results: RunResults,
}

impl<'m> MarkovController<'m> {
    pub fn new(model: &'m Model, config: RunConfig) -> Self {
        let n = model.num_states();
        Self {
            model,
            config,
            phase: Phase::NotInitialized,
            cycle: 0,
            state_probabilities: vec![0.0; n],
            next_cycle_start_prob: vec![Vec::new(); n],
            previous_path_mass: vec![Vec::new(); n],
            results: RunResults::new(model, vec![0.0; n]),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cycle(&self) -> usize {
        self.cycle
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Current per-state mass, indexed like `Model::states()`
    pub fn state_probabilities(&self) -> &[F] {
        &self.state_probabilities
    }

    pub fn results(&self) -> &RunResults {
        &self.results
    }

    pub fn into_results(self) -> RunResults {
        self.results
    }

    /// Validate the model and load the initial distribution.
    pub fn verify(&mut self) -> Result<(), ConfigurationError> {
        verify(self.model, &self.config)?;
        let initial = load_initial_distribution(self.model, self.config.tolerance)?;

        self.cycle = 0;
        self.state_probabilities = initial.clone();
        self.next_cycle_start_prob.iter_mut().for_each(Vec::clear);
        self.previous_path_mass.iter_mut().for_each(Vec::clear);
        self.results = RunResults::new(self.model, initial);
        self.phase = if self.config.total_cycles == 0 { Phase::Finished } else { Phase::Ready };
        Ok(())
    }

    /// Advance exactly one cycle.
    pub fn step(&mut self) -> Result<()> {
        match self.phase {
            Phase::Ready | Phase::Running => {}
            phase => return Err(Error::InvalidPhase { action: "step", phase }),
        }
        self.phase = Phase::Running;

        let cycle = self.cycle;
        let start = self.state_probabilities.clone();
        let per_state = self.forward_all(&start, cycle)?;

        let counting = self.config.counting;
        let mut undiscounted = Outcomes::zeroed(&self.results.variable_names);
        for (source, reports) in per_state.into_iter().enumerate() {
            let previous = std::mem::take(&mut self.previous_path_mass[source]);
            let mut current = Vec::with_capacity(reports.len());
            for (path, report) in reports.into_iter().enumerate() {
                let before = previous.get(path).copied().unwrap_or(0.0);
                self.next_cycle_start_prob[report.destination.0].push(report.mass);
                undiscounted.add_weighted(&report.outcomes, counting.occupancy(before, report.mass));
                current.push(report.mass);
            }
            self.previous_path_mass[source] = current;
        }

        let end: Vec<F> = self.next_cycle_start_prob.iter().map(|m| m.iter().sum()).collect();
        let occupancy: Vec<F> = start
            .iter()
            .zip(&end)
            .map(|(&s, &e)| counting.occupancy(s, e))
            .collect();

        for (state, &mass) in self.model.states().iter().zip(&occupancy) {
            undiscounted.add_weighted_rewards(&state.rewards, mass);
        }

        let outcomes = undiscounted.scaled(self.config.discount_factor(cycle));

        let total_mass: F = end.iter().sum();
        let initial_mass: F = self.results.initial_distribution.iter().sum();
        if (total_mass - initial_mass).abs() > MASS_DRIFT_WARNING {
            log::warn!("cycle {}: cohort mass drifted to {:.12}", cycle, total_mass);
        }
        log::debug!("cycle {}: distribution {:?}", cycle, end);

        self.results.cycles.push(CycleRecord {
            cycle,
            state_probabilities: end.clone(),
            occupancy,
            outcomes,
            undiscounted,
        });

        self.state_probabilities = end;
        self.next_cycle_start_prob.iter_mut().for_each(Vec::clear);
        self.cycle += 1;

        if self.cycle == self.config.total_cycles {
            self.phase = Phase::Finished;
            log::info!(
                "run finished after {} cycles ({} states, {} variables)",
                self.cycle,
                self.model.num_states(),
                self.results.variable_names.len()
            );
        }
        Ok(())
    }

    /// Verify if needed and step until `Finished`.
    pub fn run(&mut self) -> Result<&RunResults> {
        match self.phase {
            Phase::NotInitialized => self.verify()?,
            Phase::Finished => return Err(Error::InvalidPhase { action: "run", phase: Phase::Finished }),
            Phase::Ready | Phase::Running => {}
        }
        while self.phase != Phase::Finished {
            self.step()?;
        }
        Ok(&self.results)
    }

    /// Forward every state, empty ones included: their paths still carry
    /// last cycle's mass into the counting weight. Reports come back grouped
    /// per state in state order, so the parallel path merges identically to
    /// the sequential one.
    fn forward_all(&self, start: &[F], cycle: usize) -> Result<Vec<Vec<Report>>, ComputationError> {
        let model = self.model;
        let tolerance = self.config.tolerance;
        let forward_state = |(idx, &mass): (usize, &F)| model.forward(StateId(idx), mass, cycle, tolerance);

        if self.config.use_parallel {
            start.par_iter().enumerate().map(forward_state).collect()
        } else {
            start.iter().enumerate().map(forward_state).collect()
        }
    }
}
