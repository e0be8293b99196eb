//! Seeded parameter sampling and probabilistic sensitivity analysis (PSA)
//! for `cohort-core` models.

pub mod psa;
pub mod rng;
pub mod stats;

pub use psa::{PsaConfig, PsaEnsemble, PsaError, PsaIteration, PsaRunner};
pub use rng::ParameterRng;
pub use stats::{PsaSummary, VariableSummary};
