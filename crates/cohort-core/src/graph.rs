use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::ComputationError;
use crate::parameter::ParameterSampler;
use crate::probability::{resolve_fan_out, Probability};
use crate::rewards::Rewards;
use crate::F;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChanceId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SharedId(pub usize);

/// A vertex that owns children: either a Markov state or a chance node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    State(StateId),
    Chance(ChanceId),
}

/// One outgoing branch of a node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Child {
    Chance(ChanceId),
    Transition(TransitionId),
}

impl From<StateId> for NodeRef {
    fn from(id: StateId) -> Self {
        NodeRef::State(id)
    }
}

impl From<ChanceId> for NodeRef {
    fn from(id: ChanceId) -> Self {
        NodeRef::Chance(id)
    }
}

/// Persistent cohort state; its mass is owned by the controller
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarkovState {
    pub name: String,
    pub initial: Probability, // share of the cohort at cycle 0; may be sampled or a complement
    pub rewards: Rewards,
    pub children: Vec<Child>,
}

/// Within-cycle branch point
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChanceNode {
    pub name: String,
    pub probability: Probability, // probability of entering from the parent
    pub rewards: Rewards,
    pub children: Vec<Child>,
}

/// Terminal edge of a fan-out, landing in a Markov state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateTransition {
    pub name: String,
    pub source: NodeRef,
    pub destination: StateId,
    pub probability: Probability,
    pub rewards: Rewards,
}

/// Probability referenced by several edges through `Probability::Shared`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SharedProbability {
    pub name: String,
    pub probability: Probability,
}

/// Disease-state graph: states, chance nodes and transitions in flat arenas
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Model {
    states: Vec<MarkovState>,
    chances: Vec<ChanceNode>,
    transitions: Vec<StateTransition>,
    #[serde(default)]
    shared: Vec<SharedProbability>,
    // (owner, reference) pairs the builder could not attach
    #[serde(default)]
    dangling: Vec<(String, String)>,
}

impl Model {
    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_chance_nodes(&self) -> usize {
        self.chances.len()
    }

    pub fn states(&self) -> &[MarkovState] {
        &self.states
    }

    pub fn chance_nodes(&self) -> &[ChanceNode] {
        &self.chances
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn state(&self, id: StateId) -> &MarkovState {
        &self.states[id.0]
    }

    pub fn chance(&self, id: ChanceId) -> &ChanceNode {
        &self.chances[id.0]
    }

    pub fn transition(&self, id: TransitionId) -> &StateTransition {
        &self.transitions[id.0]
    }

    pub fn shared_probabilities(&self) -> &[SharedProbability] {
        &self.shared
    }

    pub fn shared(&self, id: SharedId) -> &SharedProbability {
        &self.shared[id.0]
    }

    /// References the builder could not attach, as `(owner, reference)`
    pub fn dangling(&self) -> &[(String, String)] {
        &self.dangling
    }

    /// Follow a `Shared` reference into the table; other variants (and
    /// unknown ids) come back unchanged
    pub fn resolve<'a>(&'a self, probability: &'a Probability) -> &'a Probability {
        match probability {
            Probability::Shared(id) => self.shared.get(id.0).map_or(probability, |s| &s.probability),
            other => other,
        }
    }

    pub fn state_ids(&self) -> impl Iterator<Item = StateId> {
        (0..self.states.len()).map(StateId)
    }

    pub fn chance_ids(&self) -> impl Iterator<Item = ChanceId> {
        (0..self.chances.len()).map(ChanceId)
    }

    /// First state with the given name
    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.states.iter().position(|s| s.name == name).map(StateId)
    }

    /// First chance node or state with the given name, states first
    pub fn lookup(&self, name: &str) -> Option<NodeRef> {
        self.state_id(name).map(NodeRef::State).or_else(|| {
            self.chances
                .iter()
                .position(|c| c.name == name)
                .map(|i| NodeRef::Chance(ChanceId(i)))
        })
    }

    pub fn state_names(&self) -> Vec<String> {
        self.states.iter().map(|s| s.name.clone()).collect()
    }

    pub fn node_name(&self, node: NodeRef) -> &str {
        match node {
            NodeRef::State(id) => &self.state(id).name,
            NodeRef::Chance(id) => &self.chance(id).name,
        }
    }

    pub fn children(&self, node: NodeRef) -> &[Child] {
        match node {
            NodeRef::State(id) => &self.state(id).children,
            NodeRef::Chance(id) => &self.chance(id).children,
        }
    }

    pub fn child_name(&self, child: Child) -> &str {
        match child {
            Child::Chance(id) => &self.chance(id).name,
            Child::Transition(id) => &self.transition(id).name,
        }
    }

    /// Probability of entering `child`, with shared entries resolved
    pub fn child_probability(&self, child: Child) -> &Probability {
        let probability = match child {
            Child::Chance(id) => &self.chance(id).probability,
            Child::Transition(id) => &self.transition(id).probability,
        };
        self.resolve(probability)
    }

    /// Cycle-0 share of each state, in state order. The initial weights form
    /// one fan-out, so a single complement state absorbs the remainder.
    pub fn initial_distribution(&self, tolerance: F) -> Result<Vec<F>, ComputationError> {
        let edges: Vec<(&str, &Probability)> = self
            .states
            .iter()
            .map(|s| (s.name.as_str(), self.resolve(&s.initial)))
            .collect();
        resolve_fan_out("initial distribution", &edges, 0, tolerance)
    }

    /// Sorted union of every reward name used anywhere in the model
    pub fn variable_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        let bags = self
            .states
            .iter()
            .map(|s| &s.rewards)
            .chain(self.chances.iter().map(|c| &c.rewards))
            .chain(self.transitions.iter().map(|t| &t.rewards));
        for bag in bags {
            names.extend(bag.keys().cloned());
        }
        names.into_iter().collect()
    }

    /// Longest time-varying schedule among all probabilities, 0 if none
    pub fn max_schedule_len(&self) -> usize {
        self.probabilities().filter_map(Probability::schedule_len).max().unwrap_or(0)
    }

    /// Every probability the model owns, including initial weights and the
    /// shared table; `Shared` references appear unresolved
    pub fn probabilities(&self) -> impl Iterator<Item = &Probability> {
        self.states
            .iter()
            .map(|s| &s.initial)
            .chain(self.chances.iter().map(|c| &c.probability))
            .chain(self.transitions.iter().map(|t| &t.probability))
            .chain(self.shared.iter().map(|s| &s.probability))
    }

    /// Draw a fresh realization for every sampled probability and reward.
    /// Each shared entry is drawn once. Topology is left untouched.
    pub fn resample(&mut self, sampler: &mut dyn ParameterSampler) -> Result<(), ComputationError> {
        for entry in &mut self.shared {
            entry.probability.resample(sampler)?;
        }
        for chance in &mut self.chances {
            chance.probability.resample(sampler)?;
            chance.rewards.resample(sampler)?;
        }
        for transition in &mut self.transitions {
            transition.probability.resample(sampler)?;
            transition.rewards.resample(sampler)?;
        }
        for state in &mut self.states {
            state.initial.resample(sampler)?;
            state.rewards.resample(sampler)?;
        }
        Ok(())
    }

    /// Return every sampled parameter to its point estimate
    pub fn reset(&mut self) {
        for entry in &mut self.shared {
            entry.probability.reset();
        }
        for chance in &mut self.chances {
            chance.probability.reset();
            chance.rewards.reset();
        }
        for transition in &mut self.transitions {
            transition.probability.reset();
            transition.rewards.reset();
        }
        for state in &mut self.states {
            state.initial.reset();
            state.rewards.reset();
        }
    }
}

/// Incremental construction of a [`Model`].
///
/// Ids returned by one builder are only meaningful to that builder. A foreign
/// parent id is recorded as dangling and reported by `verify()`.
#[derive(Clone, Debug, Default)]
pub struct ModelBuilder {
    model: Model,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&mut self, name: &str, initial: impl Into<Probability>, rewards: Rewards) -> StateId {
        let id = StateId(self.model.states.len());
        self.model.states.push(MarkovState {
            name: name.to_string(),
            initial: initial.into(),
            rewards,
            children: Vec::new(),
        });
        id
    }

    pub fn add_chance(
        &mut self,
        parent: impl Into<NodeRef>,
        name: &str,
        probability: impl Into<Probability>,
        rewards: Rewards,
    ) -> ChanceId {
        let id = ChanceId(self.model.chances.len());
        self.model.chances.push(ChanceNode {
            name: name.to_string(),
            probability: probability.into(),
            rewards,
            children: Vec::new(),
        });
        self.attach(parent.into(), Child::Chance(id), name);
        id
    }

    pub fn add_transition(
        &mut self,
        parent: impl Into<NodeRef>,
        name: &str,
        destination: StateId,
        probability: impl Into<Probability>,
        rewards: Rewards,
    ) -> TransitionId {
        let source = parent.into();
        let id = TransitionId(self.model.transitions.len());
        self.model.transitions.push(StateTransition {
            name: name.to_string(),
            source,
            destination,
            probability: probability.into(),
            rewards,
        });
        self.attach(source, Child::Transition(id), name);
        id
    }

    /// Register a probability that several edges can reference by id
    pub fn add_shared(&mut self, name: &str, probability: impl Into<Probability>) -> SharedId {
        let id = SharedId(self.model.shared.len());
        self.model.shared.push(SharedProbability {
            name: name.to_string(),
            probability: probability.into(),
        });
        id
    }

    /// Attach an existing chance node under an additional parent, sharing its
    /// subtree between both fan-outs
    pub fn link_chance(&mut self, parent: impl Into<NodeRef>, chance: ChanceId) {
        let name = match self.model.chances.get(chance.0) {
            Some(node) => node.name.clone(),
            None => format!("chance node #{}", chance.0),
        };
        self.attach(parent.into(), Child::Chance(chance), &name);
    }

    pub fn build(self) -> Model {
        self.model
    }

    fn attach(&mut self, parent: NodeRef, child: Child, name: &str) {
        let children = match parent {
            NodeRef::State(id) => self.model.states.get_mut(id.0).map(|s| &mut s.children),
            NodeRef::Chance(id) => self.model.chances.get_mut(id.0).map(|c| &mut c.children),
        };
        match children {
            Some(children) => children.push(child),
            None => self.model.dangling.push((name.to_string(), format!("parent {parent:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::tests::ScriptedSampler;
    use crate::parameter::Parameter;

    fn two_state() -> (Model, StateId, StateId) {
        let mut b = Model::builder();
        let alive = b.add_state("alive", 1.0, Rewards::new().with("cost", 10.0));
        let dead = b.add_state("dead", 0.0, Rewards::new());
        let screen = b.add_chance(alive, "screen", 0.5, Rewards::new().with("cost", 2.0));
        b.add_transition(screen, "screen_die", dead, 0.1, Rewards::new().with("qaly", -0.5));
        b.add_transition(screen, "screen_live", alive, Probability::Complement, Rewards::new());
        b.add_transition(alive, "die", dead, Parameter::uniform(0.05, 0.0, 0.1), Rewards::new());
        b.add_transition(alive, "live", alive, Probability::Complement, Rewards::new());
        b.add_transition(dead, "stay", dead, 1.0, Rewards::new());
        (b.build(), alive, dead)
    }

    #[test]
    fn test_builder_wiring() {
        let (model, alive, dead) = two_state();
        assert_eq!(model.num_states(), 2);
        assert_eq!(model.num_chance_nodes(), 1);
        assert_eq!(model.children(alive.into()).len(), 3);
        assert_eq!(model.children(dead.into()).len(), 1);
        assert_eq!(model.state_id("dead"), Some(dead));
        assert_eq!(model.lookup("screen"), Some(NodeRef::Chance(ChanceId(0))));
        assert_eq!(model.lookup("nowhere"), None);
    }

    #[test]
    fn test_variable_names_sorted_union() {
        let (model, _, _) = two_state();
        assert_eq!(model.variable_names(), vec!["cost".to_string(), "qaly".to_string()]);
    }

    #[test]
    fn test_resample_and_reset() {
        let (mut model, _, _) = two_state();
        model.resample(&mut ScriptedSampler::new(vec![0.08])).unwrap();
        let die = model.transitions().iter().find(|t| t.name == "die").unwrap();
        assert_eq!(die.probability.value(0).unwrap(), 0.08);

        model.reset();
        let die = model.transitions().iter().find(|t| t.name == "die").unwrap();
        assert_eq!(die.probability.value(0).unwrap(), 0.05);
    }

    #[test]
    fn test_shared_probability_drawn_once() {
        let mut b = Model::builder();
        let curve = b.add_shared(
            "mortality",
            Probability::TimeVarying(vec![Parameter::uniform(0.01, 0.0, 0.02), Parameter::uniform(0.02, 0.01, 0.03)]),
        );
        let a = b.add_state("a", 1.0, Rewards::new());
        let c = b.add_state("c", 0.0, Rewards::new());
        let a_c = b.add_transition(a, "a_to_c", c, curve, Rewards::new());
        let c_c = b.add_transition(c, "c_to_c", c, curve, Rewards::new());
        let mut model = b.build();

        model.resample(&mut ScriptedSampler::new(vec![0.015, 0.025, 0.9])).unwrap();
        for cycle in 0..2 {
            let left = model.child_probability(Child::Transition(a_c)).value(cycle).unwrap();
            let right = model.child_probability(Child::Transition(c_c)).value(cycle).unwrap();
            assert_eq!(left, right);
        }
        assert_eq!(model.child_probability(Child::Transition(a_c)).value(1).unwrap(), 0.025);
        assert_eq!(model.max_schedule_len(), 2);

        model.reset();
        assert_eq!(model.child_probability(Child::Transition(c_c)).value(0).unwrap(), 0.01);
    }

    #[test]
    fn test_initial_weights_resample() {
        let mut b = Model::builder();
        b.add_state("mild", Parameter::beta(0.6, 6.0, 4.0), Rewards::new());
        b.add_state("severe", Probability::Complement, Rewards::new());
        let mut model = b.build();
        assert_eq!(model.initial_distribution(1e-9).unwrap(), vec![0.6, 1.0 - (0.0 + 0.6)]);

        model.resample(&mut ScriptedSampler::new(vec![0.75])).unwrap();
        assert_eq!(model.initial_distribution(1e-9).unwrap(), vec![0.75, 1.0 - (0.0 + 0.75)]);
    }

    #[test]
    fn test_foreign_parent_recorded_not_panicking() {
        let mut b = Model::builder();
        let a = b.add_state("a", 1.0, Rewards::new());
        b.add_chance(StateId(4), "stray", 0.5, Rewards::new());
        b.link_chance(a, ChanceId(9));
        let model = b.build();

        assert_eq!(model.dangling().len(), 1);
        assert_eq!(model.dangling()[0].0, "stray");
        assert_eq!(model.children(a.into()), &[Child::Chance(ChanceId(9))]);
    }
}
