//! Markov cohort simulation engine.
//!
//! A [`Model`] is a graph of Markov states, chance nodes and state
//! transitions. A [`MarkovController`] pushes cohort mass through it one cycle
//! at a time and records per-cycle state probabilities and discounted reward
//! totals.

pub mod config;
pub mod controller;
pub mod error;
pub mod forward;
pub mod graph;
pub mod parameter;
pub mod probability;
pub mod results;
pub mod rewards;
pub mod strategy;
pub mod verify;

// Core types
pub type F = f64;

pub use config::{CountingMethod, DiscountTiming, RunConfig};
pub use controller::{MarkovController, Phase};
pub use error::{ComputationError, ConfigurationError, Error, Result};
pub use forward::Report;
pub use graph::{
    ChanceId, ChanceNode, Child, MarkovState, Model, ModelBuilder, NodeRef, SharedId, SharedProbability, StateId,
    StateTransition, TransitionId,
};
pub use parameter::{Distribution, Parameter, ParameterSampler};
pub use probability::{resolve_fan_out, Probability};
pub use results::{CycleRecord, RunResults};
pub use rewards::{Outcomes, Rewards};
pub use strategy::Strategy;
pub use verify::verify;
