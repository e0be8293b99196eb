use serde::{Deserialize, Serialize};

use crate::graph::Model;
use crate::rewards::Outcomes;
use crate::F;

/// Everything recorded for one completed cycle (zero-based index)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub cycle: usize,
    pub state_probabilities: Vec<F>, // after this cycle's transitions
    pub occupancy: Vec<F>,           // mass used for state rewards under the counting method
    pub outcomes: Outcomes,          // discounted
    pub undiscounted: Outcomes,
}

/// State-probability and variable-total tables produced by one run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    pub state_names: Vec<String>,
    pub variable_names: Vec<String>,
    pub initial_distribution: Vec<F>,
    pub cycles: Vec<CycleRecord>,
}

impl RunResults {
    pub fn new(model: &Model, initial_distribution: Vec<F>) -> Self {
        Self {
            state_names: model.state_names(),
            variable_names: model.variable_names(),
            initial_distribution,
            cycles: Vec::new(),
        }
    }

    pub fn num_cycles(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.state_names.iter().position(|n| n == name)
    }

    pub fn state_probability(&self, cycle: usize, state: &str) -> Option<F> {
        let idx = self.state_index(state)?;
        self.cycles.get(cycle).map(|c| c.state_probabilities[idx])
    }

    /// Discounted total of `variable` in `cycle`
    pub fn outcome(&self, cycle: usize, variable: &str) -> Option<F> {
        self.cycles.get(cycle).and_then(|c| c.outcomes.get(variable))
    }

    /// Rows are cycles, columns follow `state_names`
    pub fn state_table(&self) -> Vec<Vec<F>> {
        self.cycles.iter().map(|c| c.state_probabilities.clone()).collect()
    }

    /// Rows are cycles, columns follow `variable_names`
    pub fn outcome_table(&self) -> Vec<Vec<F>> {
        self.cycles
            .iter()
            .map(|c| {
                self.variable_names
                    .iter()
                    .map(|v| c.outcomes.get(v).unwrap_or(0.0))
                    .collect()
            })
            .collect()
    }

    /// Discounted outcomes summed over all cycles
    pub fn totals(&self) -> Outcomes {
        let mut totals = Outcomes::zeroed(&self.variable_names);
        for record in &self.cycles {
            totals.add_weighted(&record.outcomes, 1.0);
        }
        totals
    }

    pub fn final_distribution(&self) -> &[F] {
        self.cycles
            .last()
            .map(|c| c.state_probabilities.as_slice())
            .unwrap_or(&self.initial_distribution)
    }
}
