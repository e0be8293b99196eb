use crate::error::ComputationError;
use crate::graph::{Child, Model, NodeRef, StateId};
use crate::probability::resolve_fan_out;
use crate::rewards::Outcomes;
use crate::F;

/// Mass arriving at a destination state via one terminal transition, with the
/// reward values summed along the path (chance hops + transition)
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub destination: StateId,
    pub mass: F,
    pub outcomes: Outcomes,
}

impl Model {
    /// Resolved probabilities of `node`'s children at `cycle`, in child order
    pub fn fan_out(&self, node: NodeRef, cycle: usize, tolerance: F) -> Result<Vec<F>, ComputationError> {
        let children = self.children(node);
        let edges: Vec<(&str, &crate::Probability)> = children
            .iter()
            .map(|&c| (self.child_name(c), self.child_probability(c)))
            .collect();
        resolve_fan_out(self.node_name(node), &edges, cycle, tolerance)
    }

    /// Push `mass` out of `state` through its fan-out for one cycle.
    ///
    /// Returns one report per terminal transition reached. Chance nodes only
    /// contribute their rewards to the path; they never report by themselves.
    pub fn forward(
        &self,
        state: StateId,
        mass: F,
        cycle: usize,
        tolerance: F,
    ) -> Result<Vec<Report>, ComputationError> {
        let mut reports = Vec::new();
        self.forward_node(NodeRef::State(state), mass, cycle, tolerance, &Outcomes::new(), 0, &mut reports)?;
        Ok(reports)
    }

    #[allow(clippy::too_many_arguments)]
    fn forward_node(
        &self,
        node: NodeRef,
        mass: F,
        cycle: usize,
        tolerance: F,
        path: &Outcomes,
        depth: usize,
        reports: &mut Vec<Report>,
    ) -> Result<(), ComputationError> {
        // A DAG of chance nodes can't nest deeper than the node count
        if depth > self.num_chance_nodes() {
            return Err(ComputationError::CyclicBranching { node: self.node_name(node).to_string() });
        }

        let probs = self.fan_out(node, cycle, tolerance)?;

        for (&child, p) in self.children(node).iter().zip(probs) {
            let edge_mass = mass * p;
            match child {
                Child::Transition(id) => {
                    let transition = self.transition(id);
                    let mut outcomes = path.clone();
                    outcomes.add_rewards(&transition.rewards);
                    reports.push(Report {
                        destination: transition.destination,
                        mass: edge_mass,
                        outcomes,
                    });
                }
                Child::Chance(id) => {
                    let mut nested = path.clone();
                    nested.add_rewards(&self.chance(id).rewards);
                    self.forward_node(NodeRef::Chance(id), edge_mass, cycle, tolerance, &nested, depth + 1, reports)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Probability, Rewards};

    #[test]
    fn test_forward_through_chance_nodes() {
        let mut b = Model::builder();
        let a = b.add_state("a", 1.0, Rewards::new());
        let c = b.add_state("c", 0.0, Rewards::new());
        let k1 = b.add_chance(a, "k1", 0.4, Rewards::new().with("cost", 20.0));
        let k2 = b.add_chance(k1, "k2", Probability::Complement, Rewards::new().with("cost", 30.0));
        b.add_transition(k1, "k1_to_c", c, 0.25, Rewards::new());
        b.add_transition(k2, "k2_to_a", a, 1.0, Rewards::new().with("cost", 6.0));
        b.add_transition(a, "a_to_a", a, Probability::Complement, Rewards::new().with("cost", 1.0));
        let model = b.build();

        let reports = model.forward(a, 0.5, 0, 1e-9).unwrap();
        assert_eq!(reports.len(), 3);

        // k1 -> k2 -> a
        assert_eq!(reports[0].destination, a);
        assert_eq!(reports[0].mass, 0.5 * 0.4 * (1.0 - 0.25) * 1.0);
        assert_eq!(reports[0].outcomes.get("cost"), Some(20.0 + 30.0 + 6.0));

        // k1 -> c
        assert_eq!(reports[1].destination, c);
        assert_eq!(reports[1].mass, 0.5 * 0.4 * 0.25);
        assert_eq!(reports[1].outcomes.get("cost"), Some(20.0));

        // a -> a
        assert_eq!(reports[2].mass, 0.5 * (1.0 - 0.4));
        assert_eq!(reports[2].outcomes.get("cost"), Some(1.0));

        let total: F = reports.iter().map(|r| r.mass).sum();
        assert!((total - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_forward_detects_cycle() {
        let mut b = Model::builder();
        let a = b.add_state("a", 1.0, Rewards::new());
        let k1 = b.add_chance(a, "k1", 1.0, Rewards::new());
        let k2 = b.add_chance(k1, "k2", 1.0, Rewards::new());
        b.link_chance(k2, k1);
        let model = b.build();

        let err = model.forward(a, 1.0, 0, 1e-9).unwrap_err();
        assert!(matches!(err, ComputationError::CyclicBranching { .. }));
    }
}
