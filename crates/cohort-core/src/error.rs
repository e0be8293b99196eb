//! Error taxonomy for model construction, validation and evaluation

use thiserror::Error;

use crate::controller::Phase;
use crate::F;

/// Problems with the model or run configuration, detected by `verify()`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("outgoing probabilities of '{node}' sum to {sum} at cycle {cycle}, expected 1.0")]
    ProbabilitySumMismatch { node: String, cycle: usize, sum: F },

    #[error("state '{state}' is not reachable from the initial distribution")]
    UnreachableState { state: String },

    #[error("chance node '{node}' is part of a branching cycle")]
    CyclicBranching { node: String },

    #[error("initial distribution sums to {sum}, expected 1.0")]
    MissingInitialDistribution { sum: F },

    #[error("'{node}' has more than one complement probability among its children")]
    MultipleComplements { node: String },

    #[error("time-varying probability on '{edge}' has an empty schedule")]
    EmptySchedule { edge: String },

    #[error("probability on '{edge}' is {value} at cycle {cycle}, outside [0, 1]")]
    ProbabilityOutOfRange { edge: String, cycle: usize, value: F },

    #[error("model has no Markov states")]
    EmptyModel,

    #[error("discount rate {rate} must be finite and non-negative")]
    InvalidDiscountRate { rate: F },

    #[error("'{owner}' refers to {reference}, which this model does not contain")]
    DanglingReference { owner: String, reference: String },

    #[error("shared probability '{name}' must be a constant, sampled or time-varying value")]
    InvalidSharedProbability { name: String },
}

/// Numeric failures while evaluating probabilities or drawing samples
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    #[error("cannot sample {distribution}: {reason}")]
    InvalidDistribution { distribution: String, reason: String },

    #[error("explicit siblings under '{node}' sum to {sum} at cycle {cycle}, complement would be negative")]
    ComplementOverflow { node: String, cycle: usize, sum: F },

    #[error("probability on '{edge}' evaluated to {value} at cycle {cycle}, outside [0, 1]")]
    ProbabilityOutOfRange { edge: String, cycle: usize, value: F },

    #[error("complement probability has no sibling group to resolve against")]
    UnresolvedComplement,

    #[error("time-varying probability has an empty schedule")]
    EmptySchedule,

    #[error("shared probability #{id} can only be evaluated through its model")]
    UnresolvedShared { id: usize },

    #[error("branching below '{node}' does not terminate")]
    CyclicBranching { node: String },
}

/// Crate-level error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid model: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("computation failed: {0}")]
    Computation(#[from] ComputationError),

    #[error("controller cannot {action} while {phase:?}")]
    InvalidPhase { action: &'static str, phase: Phase },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
