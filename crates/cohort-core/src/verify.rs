//! Structural and numeric validation of a model before it is run.
//!
//! Checks run in a fixed order and stop at the first failure, so the
//! reported error always names a single offending node or edge.

use std::collections::VecDeque;

use crate::config::RunConfig;
use crate::error::{ComputationError, ConfigurationError};
use crate::graph::{ChanceId, Child, Model, NodeRef};
use crate::probability::Probability;
use crate::F;

/// Validate `model` for a run under `config`.
pub fn verify(model: &Model, config: &RunConfig) -> Result<(), ConfigurationError> {
    if model.num_states() == 0 {
        return Err(ConfigurationError::EmptyModel);
    }
    if !config.discount_rate.is_finite() || config.discount_rate < 0.0 {
        return Err(ConfigurationError::InvalidDiscountRate { rate: config.discount_rate });
    }

    check_references(model)?;
    check_fan_out_shape(model)?;
    check_acyclic_branching(model)?;
    let initial = load_initial_distribution(model, config.tolerance)?;

    // Constant and sampled values are cycle-independent; schedules hold their
    // last entry, so their defined indices cover every distinct cycle.
    let horizon = model.max_schedule_len().max(1);
    for cycle in 0..horizon {
        check_fan_out_sums(model, cycle, config.tolerance)?;
    }

    check_reachability(model, &initial)?;

    log::debug!(
        "verified model: {} states, {} chance nodes, {} transitions, {} cycles checked",
        model.num_states(),
        model.num_chance_nodes(),
        model.transitions().len(),
        horizon
    );
    Ok(())
}

fn nodes(model: &Model) -> impl Iterator<Item = NodeRef> + '_ {
    model
        .state_ids()
        .map(NodeRef::State)
        .chain(model.chance_ids().map(NodeRef::Chance))
}

/// Every id stored in the model must point into this model's arenas
fn check_references(model: &Model) -> Result<(), ConfigurationError> {
    if let Some((owner, reference)) = model.dangling().first() {
        return Err(ConfigurationError::DanglingReference { owner: owner.clone(), reference: reference.clone() });
    }

    let dangling = |owner: &str, reference: String| ConfigurationError::DanglingReference {
        owner: owner.to_string(),
        reference,
    };
    let shared_ok = |probability: &Probability| match probability {
        Probability::Shared(id) => id.0 < model.shared_probabilities().len(),
        _ => true,
    };

    for node in nodes(model) {
        for &child in model.children(node) {
            let known = match child {
                Child::Chance(id) => id.0 < model.num_chance_nodes(),
                Child::Transition(id) => id.0 < model.transitions().len(),
            };
            if !known {
                return Err(dangling(model.node_name(node), format!("{child:?}")));
            }
        }
    }
    for transition in model.transitions() {
        if transition.destination.0 >= model.num_states() {
            return Err(dangling(&transition.name, format!("{:?}", transition.destination)));
        }
        if !shared_ok(&transition.probability) {
            return Err(dangling(&transition.name, format!("{:?}", transition.probability)));
        }
    }
    for chance in model.chance_nodes() {
        if !shared_ok(&chance.probability) {
            return Err(dangling(&chance.name, format!("{:?}", chance.probability)));
        }
    }
    for state in model.states() {
        if !shared_ok(&state.initial) {
            return Err(dangling(&state.name, format!("{:?}", state.initial)));
        }
    }
    for entry in model.shared_probabilities() {
        if matches!(entry.probability, Probability::Complement | Probability::Shared(_)) {
            return Err(ConfigurationError::InvalidSharedProbability { name: entry.name.clone() });
        }
        if entry.probability.schedule_len() == Some(0) {
            return Err(ConfigurationError::EmptySchedule { edge: entry.name.clone() });
        }
    }
    Ok(())
}

fn check_fan_out_shape(model: &Model) -> Result<(), ConfigurationError> {
    for node in nodes(model) {
        let mut complements = 0;
        for &child in model.children(node) {
            let prob = model.child_probability(child);
            if prob.is_complement() {
                complements += 1;
            }
            if prob.schedule_len() == Some(0) {
                return Err(ConfigurationError::EmptySchedule { edge: model.child_name(child).to_string() });
            }
        }
        if complements > 1 {
            return Err(ConfigurationError::MultipleComplements { node: model.node_name(node).to_string() });
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

fn check_acyclic_branching(model: &Model) -> Result<(), ConfigurationError> {
    let mut marks = vec![Mark::Unvisited; model.num_chance_nodes()];
    for id in model.chance_ids() {
        if marks[id.0] == Mark::Unvisited {
            visit_chance(model, id, &mut marks)?;
        }
    }
    Ok(())
}

fn visit_chance(model: &Model, id: ChanceId, marks: &mut [Mark]) -> Result<(), ConfigurationError> {
    marks[id.0] = Mark::InProgress;
    for &child in &model.chance(id).children {
        if let Child::Chance(next) = child {
            match marks[next.0] {
                Mark::InProgress => {
                    return Err(ConfigurationError::CyclicBranching { node: model.chance(next).name.clone() });
                }
                Mark::Unvisited => visit_chance(model, next, marks)?,
                Mark::Done => {}
            }
        }
    }
    marks[id.0] = Mark::Done;
    Ok(())
}

/// Resolve the cycle-0 distribution and check that it sums to one
pub(crate) fn load_initial_distribution(model: &Model, tolerance: F) -> Result<Vec<F>, ConfigurationError> {
    const OWNER: &str = "initial distribution";
    let initial = model.initial_distribution(tolerance).map_err(|err| match err {
        ComputationError::ComplementOverflow { sum, .. } => ConfigurationError::MissingInitialDistribution { sum },
        ComputationError::ProbabilityOutOfRange { edge, value, .. } => {
            ConfigurationError::ProbabilityOutOfRange { edge, cycle: 0, value }
        }
        ComputationError::EmptySchedule => ConfigurationError::EmptySchedule { edge: OWNER.to_string() },
        _ => ConfigurationError::MultipleComplements { node: OWNER.to_string() },
    })?;

    let sum: F = initial.iter().sum();
    if (sum - 1.0).abs() > tolerance {
        return Err(ConfigurationError::MissingInitialDistribution { sum });
    }
    Ok(initial)
}

fn check_fan_out_sums(model: &Model, cycle: usize, tolerance: F) -> Result<(), ConfigurationError> {
    for node in nodes(model) {
        let name = model.node_name(node).to_string();
        let values = model.fan_out(node, cycle, tolerance).map_err(|err| match err {
            ComputationError::ComplementOverflow { sum, .. } => {
                ConfigurationError::ProbabilitySumMismatch { node: name.clone(), cycle, sum }
            }
            ComputationError::ProbabilityOutOfRange { edge, value, .. } => {
                ConfigurationError::ProbabilityOutOfRange { edge, cycle, value }
            }
            ComputationError::EmptySchedule => ConfigurationError::EmptySchedule { edge: name.clone() },
            _ => ConfigurationError::MultipleComplements { node: name.clone() },
        })?;

        let sum: F = values.iter().sum();
        if (sum - 1.0).abs() > tolerance {
            return Err(ConfigurationError::ProbabilitySumMismatch { node: name, cycle, sum });
        }
    }
    Ok(())
}

/// Every state must be reachable from a state that can hold initial mass,
/// following edges regardless of their current probability value. A state
/// whose initial weight is anything but a constant may hold mass in some
/// realization, so it seeds the search too.
fn check_reachability(model: &Model, initial: &[F]) -> Result<(), ConfigurationError> {
    let mut reached = vec![false; model.num_states()];
    let mut queue: VecDeque<NodeRef> = VecDeque::new();

    for id in model.state_ids() {
        let varies = !matches!(model.resolve(&model.state(id).initial), Probability::Constant(_));
        if initial[id.0] > 0.0 || varies {
            reached[id.0] = true;
            queue.push_back(NodeRef::State(id));
        }
    }

    let mut chance_seen = vec![false; model.num_chance_nodes()];
    while let Some(node) = queue.pop_front() {
        for &child in model.children(node) {
            match child {
                Child::Transition(t) => {
                    let dest = model.transition(t).destination;
                    if !reached[dest.0] {
                        reached[dest.0] = true;
                        queue.push_back(NodeRef::State(dest));
                    }
                }
                Child::Chance(c) => {
                    if !chance_seen[c.0] {
                        chance_seen[c.0] = true;
                        queue.push_back(NodeRef::Chance(c));
                    }
                }
            }
        }
    }

    match reached.iter().position(|r| !r) {
        Some(idx) => Err(ConfigurationError::UnreachableState { state: model.states()[idx].name.clone() }),
        None => Ok(()),
    }
}
